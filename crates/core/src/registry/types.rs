//! Registry entry types.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::sync::{oneshot, watch};

use crate::coordinator::DownloadError;
use crate::placer::{OverwritePolicy, PlacementOutcome};
use crate::transport::TransferProgress;

/// What a waiting caller eventually receives for one task.
pub type DownloadResult = Result<PlacementOutcome, DownloadError>;

/// A download that has been started but not yet concluded.
#[derive(Debug)]
pub struct PendingDownload {
    /// Where the caller wants the payload.
    pub destination: PathBuf,
    /// How to treat an existing destination.
    pub policy: OverwritePolicy,
    /// When the entry was created.
    pub registered_at: DateTime<Utc>,
    completion: Option<oneshot::Sender<DownloadResult>>,
    progress: Option<watch::Sender<TransferProgress>>,
}

impl PendingDownload {
    pub fn new(destination: impl Into<PathBuf>, policy: OverwritePolicy) -> Self {
        Self {
            destination: destination.into(),
            policy,
            registered_at: Utc::now(),
            completion: None,
            progress: None,
        }
    }

    /// Attaches the channel the final result is delivered on.
    pub fn with_completion(mut self, tx: oneshot::Sender<DownloadResult>) -> Self {
        self.completion = Some(tx);
        self
    }

    /// Attaches the channel progress updates are published on.
    pub fn with_progress(mut self, tx: watch::Sender<TransferProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Publishes a progress update. Silently ignored if nobody listens.
    pub fn publish_progress(&self, progress: TransferProgress) {
        if let Some(tx) = &self.progress {
            tx.send_replace(progress);
        }
    }

    /// Delivers the final result, consuming the entry.
    ///
    /// Returns `false` if there was no waiter or it went away.
    pub fn complete(self, result: DownloadResult) -> bool {
        match self.completion {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Milliseconds since the entry was registered.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.registered_at).num_milliseconds()
    }
}
