//! Error types for the placer module.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem operation that failed during placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOperation {
    /// Checking whether a path exists and what it is.
    Inspect,
    /// Deleting an existing destination.
    Remove,
    /// Renaming the payload into place.
    Move,
    /// Copying the payload across volumes.
    Copy,
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            FsOperation::Inspect => "inspect",
            FsOperation::Remove => "remove",
            FsOperation::Move => "move to",
            FsOperation::Copy => "copy to",
        };
        f.write_str(verb)
    }
}

/// Errors that can occur while placing a downloaded payload.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// The policy would put a file where a directory already is.
    #[error("Destination is a directory: {path}")]
    DestinationIsDirectory { path: PathBuf },

    /// The temporary payload no longer exists.
    #[error("Source payload not found: {path}")]
    SourceMissing { path: PathBuf },

    /// Every generated alternate name was already taken.
    #[error("No free alternate name for {path} after {attempts} attempts")]
    NoFreeName { path: PathBuf, attempts: u32 },

    /// An underlying filesystem call failed.
    #[error("Failed to {op} {path}")]
    Filesystem {
        op: FsOperation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlacerError {
    /// Creates a filesystem error.
    pub fn filesystem(op: FsOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// The I/O error behind this failure, if there is one.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            Self::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}
