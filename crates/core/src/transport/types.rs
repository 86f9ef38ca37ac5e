//! Types shared by transport implementations.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a transfer within one transport session.
///
/// Identifiers are handed out by the transport and are only unique for the
/// lifetime of that transport; two sessions may reuse the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Errors that can occur inside a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Server returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Failed to write temporary payload: {0}")]
    Storage(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task already started: {0}")]
    AlreadyStarted(TaskId),
}

/// A request to download a single resource.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Source URL.
    pub url: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Bytes moved so far for one transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Bytes received.
    pub transferred: u64,
    /// Expected size, if the server announced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(transferred: u64, total: Option<u64>) -> Self {
        Self { transferred, total }
    }

    /// Fraction complete in `0.0..=1.0`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.transferred as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// What happened to a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// More bytes arrived.
    Progress(TransferProgress),
    /// The payload is complete and sits at `temp_path`.
    Completed { temp_path: PathBuf },
    /// The transfer failed; no payload is available.
    Failed { error: TransportError },
}

/// Event emitted by a transport for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub task_id: TaskId,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn progress(task_id: TaskId, progress: TransferProgress) -> Self {
        Self {
            task_id,
            kind: TransportEventKind::Progress(progress),
        }
    }

    pub fn completed(task_id: TaskId, temp_path: impl Into<PathBuf>) -> Self {
        Self {
            task_id,
            kind: TransportEventKind::Completed {
                temp_path: temp_path.into(),
            },
        }
    }

    pub fn failed(task_id: TaskId, error: TransportError) -> Self {
        Self {
            task_id,
            kind: TransportEventKind::Failed { error },
        }
    }

    /// Whether this event concludes the task.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, TransportEventKind::Progress(_))
    }
}

/// A source of download tasks and their completion events.
///
/// Tasks are created suspended so the caller can record where the payload
/// should go before any event for the task can be emitted. Events for every
/// task are delivered on the single receiver handed out when the transport
/// is constructed; each task produces exactly one terminal event unless it
/// is cancelled first.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of this transport implementation.
    fn name(&self) -> &str;

    /// Allocates a suspended task for `request`.
    async fn create_task(&self, request: DownloadRequest) -> Result<TaskId, TransportError>;

    /// Starts a task previously returned by `create_task`.
    async fn resume(&self, task_id: TaskId) -> Result<(), TransportError>;

    /// Aborts a task. Returns `false` if the task is unknown or already done.
    async fn cancel(&self, task_id: TaskId) -> bool;
}
