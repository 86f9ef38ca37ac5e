//! Mock transport for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::transport::{
    DownloadRequest, TaskId, TransferProgress, Transport, TransportError, TransportEvent,
};

/// Buffer for the mock event channel; large enough that tests never block.
const EVENT_BUFFER: usize = 1024;

/// A recorded create_task call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The id that was handed out.
    pub task_id: TaskId,
    /// The request that was made.
    pub request: DownloadRequest,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Lifecycle of a mock task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockTaskState {
    Suspended,
    Running,
    Cancelled,
    Finished,
}

/// Mock implementation of the Transport trait.
///
/// No network traffic happens. Tests drive each task by injecting the events
/// a real transport would emit:
/// - Track created tasks for assertions
/// - Emit progress, completion and failure events on demand
/// - Simulate failures and id reuse
///
/// # Example
///
/// ```rust,ignore
/// let (transport, events) = MockTransport::new();
/// let transport = Arc::new(transport);
/// let coordinator = DownloadCoordinator::new(Arc::clone(&transport), placer);
/// coordinator.start(events);
///
/// let handle = coordinator.begin_download("http://x/a.zip", &dest, OverwritePolicy::Keep).await?;
/// transport.complete(handle.task_id(), &payload).await;
/// let outcome = handle.wait().await?;
/// ```
#[derive(Debug)]
pub struct MockTransport {
    /// Recorded create_task calls.
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    /// Current task states by id.
    tasks: Arc<RwLock<HashMap<TaskId, MockTaskState>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TransportError>>>,
    /// Counter for generating task ids.
    next_id: AtomicU64,
    /// Where events are delivered.
    events_tx: mpsc::Sender<TransportEvent>,
}

impl MockTransport {
    /// Create a new mock transport and its event receiver.
    pub fn new() -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        (
            Self {
                requests: Arc::new(RwLock::new(Vec::new())),
                tasks: Arc::new(RwLock::new(HashMap::new())),
                next_error: Arc::new(RwLock::new(None)),
                next_id: AtomicU64::new(1),
                events_tx,
            },
            events_rx,
        )
    }

    /// Make the next created task use `id`, e.g. to simulate id reuse.
    pub fn set_next_id(&self, id: u64) {
        self.next_id.store(id, Ordering::SeqCst);
    }

    /// Get all recorded create_task calls.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Current state of a task.
    pub async fn task_state(&self, task_id: TaskId) -> Option<MockTaskState> {
        self.tasks.read().await.get(&task_id).copied()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TransportError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TransportError> {
        self.next_error.write().await.take()
    }

    /// Emit an arbitrary event, bypassing task state.
    pub async fn emit(&self, event: TransportEvent) {
        if event.is_terminal() {
            if let Some(state) = self.tasks.write().await.get_mut(&event.task_id) {
                *state = MockTaskState::Finished;
            }
        }
        // The receiver only goes away when the test tears down.
        let _ = self.events_tx.send(event).await;
    }

    /// Report progress for a task.
    pub async fn progress(&self, task_id: TaskId, transferred: u64, total: Option<u64>) {
        self.emit(TransportEvent::progress(
            task_id,
            TransferProgress::new(transferred, total),
        ))
        .await;
    }

    /// Report that a task's payload is ready at `temp_path`.
    pub async fn complete(&self, task_id: TaskId, temp_path: impl Into<PathBuf>) {
        self.emit(TransportEvent::completed(task_id, temp_path)).await;
    }

    /// Report that a task failed.
    pub async fn fail(&self, task_id: TaskId, error: TransportError) {
        self.emit(TransportEvent::failed(task_id, error)).await;
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_task(&self, request: DownloadRequest) -> Result<TaskId, TransportError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let task_id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tasks
            .write()
            .await
            .insert(task_id, MockTaskState::Suspended);
        self.requests.write().await.push(RecordedRequest {
            task_id,
            request,
            timestamp: Utc::now(),
        });

        Ok(task_id)
    }

    async fn resume(&self, task_id: TaskId) -> Result<(), TransportError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task_id) {
            Some(state) if *state == MockTaskState::Suspended => {
                *state = MockTaskState::Running;
                Ok(())
            }
            Some(_) => Err(TransportError::AlreadyStarted(task_id)),
            None => Err(TransportError::TaskNotFound(task_id)),
        }
    }

    async fn cancel(&self, task_id: TaskId) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task_id) {
            Some(state)
                if matches!(*state, MockTaskState::Suspended | MockTaskState::Running) =>
            {
                *state = MockTaskState::Cancelled;
                true
            }
            _ => false,
        }
    }
}
