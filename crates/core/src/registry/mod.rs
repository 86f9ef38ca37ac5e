//! Registry of in-flight downloads.
//!
//! Maps the transport's [`TaskId`] to where the payload should go and who is
//! waiting for it. Each entry is handed out exactly once: the first
//! completion, failure or cancellation for a task removes it, and any later
//! event for the same id finds nothing.

mod types;

pub use types::{DownloadResult, PendingDownload};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::trace;

use crate::transport::{TaskId, TransferProgress};

/// Errors returned by the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The transport handed out an id that is still live.
    #[error("Task {0} is already registered")]
    AlreadyRegistered(TaskId),
}

/// Thread-safe map from task id to pending download.
///
/// The lock is only held for the map operation itself, never across I/O.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: Mutex<HashMap<TaskId, PendingDownload>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<TaskId, PendingDownload>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records where the payload of `task_id` should go.
    ///
    /// A live entry for the same id is never replaced.
    pub fn register(&self, task_id: TaskId, entry: PendingDownload) -> Result<(), RegistryError> {
        let mut entries = self.entries();
        if entries.contains_key(&task_id) {
            return Err(RegistryError::AlreadyRegistered(task_id));
        }

        trace!(
            "Registered task {} -> {} ({})",
            task_id,
            entry.destination.display(),
            entry.policy
        );
        entries.insert(task_id, entry);
        Ok(())
    }

    /// Removes and returns the entry for `task_id`.
    ///
    /// Returns `None` for ids that were never registered or were already
    /// resolved.
    pub fn resolve(&self, task_id: TaskId) -> Option<PendingDownload> {
        self.entries().remove(&task_id)
    }

    /// Forwards progress to whoever holds the task's handle.
    ///
    /// Returns `false` if the task is not registered.
    pub fn report_progress(&self, task_id: TaskId, progress: TransferProgress) -> bool {
        match self.entries().get(&task_id) {
            Some(entry) => {
                entry.publish_progress(progress);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.entries().contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Ids of all pending tasks, in ascending order.
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.entries().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Removes every entry.
    pub fn drain(&self) -> Vec<(TaskId, PendingDownload)> {
        self.entries().drain().collect()
    }
}
