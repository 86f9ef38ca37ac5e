//! `reqwest` backed transport.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::placer::random_letters;

use super::config::HttpTransportConfig;
use super::types::{
    DownloadRequest, TaskId, TransferProgress, Transport, TransportError, TransportEvent,
};

/// Length of the random part of temporary payload names.
const TEMP_SUFFIX_LEN: usize = 9;

enum TaskSlot {
    Suspended(DownloadRequest),
    Running {
        handle: JoinHandle<()>,
        temp_path: PathBuf,
    },
}

type TaskTable = Arc<Mutex<HashMap<TaskId, TaskSlot>>>;

/// HTTP transport that streams response bodies into a temporary directory.
///
/// Each resumed task runs on its own tokio task and reports progress and
/// its terminal event on the channel returned by [`HttpTransport::new`].
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    next_id: AtomicU64,
    tasks: TaskTable,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl HttpTransport {
    /// Create a transport and the receiver its events are delivered on.
    pub fn new(
        config: HttpTransportConfig,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));

        Ok((
            Self {
                client,
                config,
                next_id: AtomicU64::new(1),
                tasks: Arc::new(Mutex::new(HashMap::new())),
                events_tx,
            },
            events_rx,
        ))
    }

    /// Number of tasks that are suspended or running.
    pub fn active_tasks(&self) -> usize {
        lock(&self.tasks).len()
    }

    fn temp_path_for(&self, task_id: TaskId) -> PathBuf {
        self.config.temp_dir.join(format!(
            "stowaway-{}-{}.part",
            task_id,
            random_letters(TEMP_SUFFIX_LEN)
        ))
    }
}

fn lock(tasks: &TaskTable) -> MutexGuard<'_, HashMap<TaskId, TaskSlot>> {
    // The table stays consistent even if a holder panicked.
    tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidUrl(e.to_string())
    } else {
        TransportError::ConnectionFailed(e.to_string())
    }
}

/// Streams `url` into `file`, emitting progress as chunks arrive.
async fn stream_to_file(
    client: &Client,
    url: &str,
    mut file: File,
    task_id: TaskId,
    events_tx: &mpsc::Sender<TransportEvent>,
) -> Result<(), TransportError> {
    let response = client.get(url).send().await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let total = response.content_length();

    let mut stream = response.bytes_stream();
    let mut transferred = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| TransportError::Storage(e.to_string()))?;
        transferred += chunk.len() as u64;

        // Progress is advisory, drop updates rather than stall the transfer.
        let _ = events_tx.try_send(TransportEvent::progress(
            task_id,
            TransferProgress::new(transferred, total),
        ));
    }

    file.flush()
        .await
        .map_err(|e| TransportError::Storage(e.to_string()))?;

    debug!("Task {} received {} bytes from {}", task_id, transferred, url);
    Ok(())
}

async fn remove_payload(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "Failed to remove partial payload {}: {}",
                temp_path.display(),
                e
            );
        }
    }
}

async fn run_transfer(
    client: Client,
    request: DownloadRequest,
    file: File,
    temp_path: PathBuf,
    task_id: TaskId,
    tasks: TaskTable,
    events_tx: mpsc::Sender<TransportEvent>,
) {
    let result = stream_to_file(&client, &request.url, file, task_id, &events_tx).await;

    // A missing slot means the task was cancelled while finishing up.
    let cancelled = lock(&tasks).remove(&task_id).is_none();

    if result.is_err() || cancelled {
        remove_payload(&temp_path).await;
    }
    if cancelled {
        return;
    }

    let event = match result {
        Ok(()) => TransportEvent::completed(task_id, temp_path),
        Err(error) => TransportEvent::failed(task_id, error),
    };

    if events_tx.send(event).await.is_err() {
        warn!("Event receiver dropped before task {} concluded", task_id);
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_task(&self, request: DownloadRequest) -> Result<TaskId, TransportError> {
        Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let task_id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.tasks).insert(task_id, TaskSlot::Suspended(request));

        Ok(task_id)
    }

    async fn resume(&self, task_id: TaskId) -> Result<(), TransportError> {
        fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(|e| TransportError::Storage(e.to_string()))?;

        match lock(&self.tasks).get(&task_id) {
            Some(TaskSlot::Suspended(_)) => {}
            Some(TaskSlot::Running { .. }) => return Err(TransportError::AlreadyStarted(task_id)),
            None => return Err(TransportError::TaskNotFound(task_id)),
        }

        // The payload file exists before the task can be seen as running, so
        // cancel always finds something to remove.
        let temp_path = self.temp_path_for(task_id);
        let file = File::create(&temp_path)
            .await
            .map_err(|e| TransportError::Storage(e.to_string()))?;

        let started = {
            let mut tasks = lock(&self.tasks);
            match tasks.remove(&task_id) {
                Some(TaskSlot::Suspended(request)) => {
                    debug!(
                        "Starting task {} for {} into {}",
                        task_id,
                        request.url,
                        temp_path.display()
                    );

                    // The table lock is held across spawn so the slot exists
                    // before the transfer can try to remove it.
                    let handle = tokio::spawn(run_transfer(
                        self.client.clone(),
                        request,
                        file,
                        temp_path.clone(),
                        task_id,
                        Arc::clone(&self.tasks),
                        self.events_tx.clone(),
                    ));
                    tasks.insert(
                        task_id,
                        TaskSlot::Running {
                            handle,
                            temp_path: temp_path.clone(),
                        },
                    );
                    Ok(())
                }
                // Cancelled or started elsewhere while the file was created.
                Some(running) => {
                    tasks.insert(task_id, running);
                    Err(TransportError::AlreadyStarted(task_id))
                }
                None => Err(TransportError::TaskNotFound(task_id)),
            }
        };

        if started.is_err() {
            remove_payload(&temp_path).await;
        }
        started
    }

    async fn cancel(&self, task_id: TaskId) -> bool {
        let slot = lock(&self.tasks).remove(&task_id);

        match slot {
            Some(TaskSlot::Suspended(_)) => true,
            Some(TaskSlot::Running { handle, temp_path }) => {
                handle.abort();
                // Let the aborted transfer unwind before its file goes away.
                let _ = handle.await;
                remove_payload(&temp_path).await;
                true
            }
            None => false,
        }
    }
}
