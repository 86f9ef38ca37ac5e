//! Error types for the coordinator module.

use std::path::PathBuf;
use thiserror::Error;

use crate::placer::PlacerError;
use crate::registry::RegistryError;
use crate::transport::{TaskId, TransportError};

/// Errors a caller can receive for one download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The transfer itself failed.
    #[error("Transfer failed: {0}")]
    Transport(#[from] TransportError),

    /// The payload arrived but could not be placed.
    #[error("Placement failed: {0}")]
    Placement(#[from] PlacerError),

    /// An event arrived for a task nobody registered.
    #[error("No pending download for task {0}")]
    UnregisteredTask(TaskId),

    /// Bookkeeping for the task could not be recorded.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The caller cancelled the task.
    #[error("Download cancelled")]
    Cancelled,

    /// The event stream ended before the task concluded.
    #[error("Task {0} was abandoned before it concluded")]
    Abandoned(TaskId),

    /// The in-memory fetch could not use its cache file.
    #[error("Cache file error at {path}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// The placement failure behind this error, if any.
    pub fn placement(&self) -> Option<&PlacerError> {
        match self {
            Self::Placement(e) => Some(e),
            _ => None,
        }
    }

    /// Stage label for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Placement(_) => "placement",
            Self::UnregisteredTask(_) | Self::Registry(_) => "registry",
            Self::Cancelled => "cancelled",
            Self::Abandoned(_) => "abandoned",
            Self::Cache { .. } => "cache",
        }
    }
}
