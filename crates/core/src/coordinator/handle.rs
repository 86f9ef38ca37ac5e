//! Caller-side handle for one download.

use tokio::sync::{oneshot, watch};

use crate::registry::DownloadResult;
use crate::transport::{TaskId, TransferProgress};

use super::error::DownloadError;

/// Handle returned by [`DownloadCoordinator::begin_download`](super::DownloadCoordinator::begin_download).
///
/// Resolves once with the placement outcome. Dropping the handle does not
/// cancel the download.
#[derive(Debug)]
pub struct TaskHandle {
    task_id: TaskId,
    outcome: oneshot::Receiver<DownloadResult>,
    progress: watch::Receiver<TransferProgress>,
}

impl TaskHandle {
    pub(crate) fn new(
        task_id: TaskId,
        outcome: oneshot::Receiver<DownloadResult>,
        progress: watch::Receiver<TransferProgress>,
    ) -> Self {
        Self {
            task_id,
            outcome,
            progress,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// A receiver that observes transfer progress.
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress.clone()
    }

    /// Most recent progress update.
    pub fn latest_progress(&self) -> TransferProgress {
        *self.progress.borrow()
    }

    /// Waits for the download to be placed, skipped or fail.
    pub async fn wait(self) -> DownloadResult {
        let task_id = self.task_id;
        self.outcome
            .await
            .unwrap_or(Err(DownloadError::Abandoned(task_id)))
    }
}
