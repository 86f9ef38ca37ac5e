//! Download coordinator implementation.
//!
//! Starts transfers on a transport, records where each payload should go,
//! and when the transport reports a terminal event hands the payload to the
//! placer and delivers the outcome to the caller's [`TaskHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::fs;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::metrics;
use crate::placer::{
    random_letters, FsPlacer, OverwritePolicy, PlacementOutcome, PlacementRequest, Placer,
};
use crate::registry::{PendingDownload, TaskRegistry};
use crate::transport::{
    DownloadRequest, HttpTransport, TaskId, TransferProgress, Transport, TransportError,
    TransportEvent, TransportEventKind,
};

use super::error::DownloadError;
use super::handle::TaskHandle;

/// Length of the random file name used by [`DownloadCoordinator::fetch`].
const CACHE_NAME_LEN: usize = 9;

/// The download coordinator - owns the registry and routes transport events.
pub struct DownloadCoordinator<T, P>
where
    T: Transport + 'static,
    P: Placer + 'static,
{
    transport: Arc<T>,
    placer: Arc<P>,
    registry: Arc<TaskRegistry>,
    default_policy: OverwritePolicy,
    cache_dir: PathBuf,
}

impl<T, P> Clone for DownloadCoordinator<T, P>
where
    T: Transport + 'static,
    P: Placer + 'static,
{
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            placer: Arc::clone(&self.placer),
            registry: Arc::clone(&self.registry),
            default_policy: self.default_policy,
            cache_dir: self.cache_dir.clone(),
        }
    }
}

impl<T, P> DownloadCoordinator<T, P>
where
    T: Transport + 'static,
    P: Placer + 'static,
{
    /// Create a new coordinator.
    pub fn new(transport: Arc<T>, placer: Arc<P>) -> Self {
        Self {
            transport,
            placer,
            registry: Arc::new(TaskRegistry::new()),
            default_policy: OverwritePolicy::Rename,
            cache_dir: std::env::temp_dir().join("stowaway-cache"),
        }
    }

    /// Sets the policy used by [`begin_download_default`](Self::begin_download_default).
    pub fn with_default_policy(mut self, policy: OverwritePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Sets the directory [`fetch`](Self::fetch) downloads into.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of downloads still awaiting a terminal event.
    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    /// Spawns the loop that consumes transport events.
    ///
    /// Each terminal event is handled on its own task, so placements for
    /// different downloads run concurrently. When the event stream ends,
    /// every download still pending is concluded as abandoned.
    pub fn start(&self, mut events: mpsc::Receiver<TransportEvent>) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let placer = Arc::clone(&self.placer);

        tokio::spawn(async move {
            debug!("Coordinator event loop started");

            while let Some(event) = events.recv().await {
                if !event.is_terminal() {
                    let _ = dispatch(&registry, placer.as_ref(), event).await;
                    continue;
                }

                let registry = Arc::clone(&registry);
                let placer = Arc::clone(&placer);
                tokio::spawn(async move {
                    if let Err(e) = dispatch(&registry, placer.as_ref(), event).await {
                        warn!("{}", e);
                    }
                });
            }

            let abandoned = registry.drain();
            if !abandoned.is_empty() {
                warn!(
                    "Transport event stream closed with {} downloads pending",
                    abandoned.len()
                );
            }
            for (task_id, entry) in abandoned {
                entry.complete(Err(DownloadError::Abandoned(task_id)));
            }

            debug!("Coordinator event loop stopped");
        })
    }

    /// Handles one transport event inline.
    ///
    /// Returns [`DownloadError::UnregisteredTask`] when a terminal event has
    /// no registry entry; placement failures go to the task's waiter instead.
    pub async fn handle_event(&self, event: TransportEvent) -> Result<(), DownloadError> {
        dispatch(&self.registry, self.placer.as_ref(), event).await
    }

    /// Starts downloading `url` and places the payload at `destination`.
    pub async fn begin_download(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
        policy: OverwritePolicy,
    ) -> Result<TaskHandle, DownloadError> {
        let destination = destination.as_ref();
        let task_id = self
            .transport
            .create_task(DownloadRequest::new(url))
            .await?;

        let (done_tx, done_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = watch::channel(TransferProgress::default());
        let entry = PendingDownload::new(destination, policy)
            .with_completion(done_tx)
            .with_progress(progress_tx);

        // Register before resuming so no event can outrun its entry.
        // The id names the live task too, so the new one is not cancelled.
        if let Err(e) = self.registry.register(task_id, entry) {
            error!("Transport reused live task id {}", task_id);
            return Err(e.into());
        }

        if let Err(e) = self.transport.resume(task_id).await {
            self.registry.resolve(task_id);
            // Release the suspended task so the transport does not keep it.
            // An already running task under this id belongs to someone else.
            if !matches!(e, TransportError::AlreadyStarted(_)) {
                self.transport.cancel(task_id).await;
            }
            warn!("Task {} could not be started: {}", task_id, e);
            return Err(e.into());
        }

        metrics::DOWNLOADS_STARTED.inc();
        info!(
            "Task {} started: {} -> {} ({})",
            task_id,
            url,
            destination.display(),
            policy
        );

        Ok(TaskHandle::new(task_id, done_rx, progress_rx))
    }

    /// Like [`begin_download`](Self::begin_download) with the configured default policy.
    pub async fn begin_download_default(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<TaskHandle, DownloadError> {
        self.begin_download(url, destination, self.default_policy)
            .await
    }

    /// Cancels a pending download.
    ///
    /// The registry entry is removed and the waiter receives
    /// [`DownloadError::Cancelled`]. Returns `false` if the task already
    /// concluded or was never registered.
    pub async fn cancel(&self, task_id: TaskId) -> bool {
        let Some(entry) = self.registry.resolve(task_id) else {
            debug!("Cancel for task {} ignored, nothing pending", task_id);
            return false;
        };

        if !self.transport.cancel(task_id).await {
            debug!("Transport had already finished task {}", task_id);
        }

        metrics::DOWNLOADS_CANCELLED.inc();
        info!("Task {} cancelled", task_id);
        entry.complete(Err(DownloadError::Cancelled));
        true
    }

    /// Downloads `url` into memory.
    ///
    /// The payload goes through a randomly named file in the cache directory
    /// with the overwrite policy, is read back, and the file is removed.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|source| DownloadError::Cache {
                path: self.cache_dir.clone(),
                source,
            })?;

        let cache_path = self.cache_dir.join(random_letters(CACHE_NAME_LEN));
        let outcome = self
            .begin_download(url, &cache_path, OverwritePolicy::Overwrite)
            .await?
            .wait()
            .await?;

        let path = outcome.path();
        let data = fs::read(path).await.map_err(|source| DownloadError::Cache {
            path: path.to_path_buf(),
            source,
        })?;

        if let Err(e) = fs::remove_file(path).await {
            warn!("Failed to remove cache file {}: {}", path.display(), e);
        }

        Ok(Bytes::from(data))
    }
}

impl DownloadCoordinator<HttpTransport, FsPlacer> {
    /// Builds an HTTP coordinator from configuration and starts its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_http(config: &Config) -> Result<(Self, JoinHandle<()>), DownloadError> {
        let (transport, events) = HttpTransport::new(config.transport.clone())?;
        let placer = FsPlacer::new(config.placement.clone());

        let coordinator = Self::new(Arc::new(transport), Arc::new(placer))
            .with_default_policy(config.placement.default_policy)
            .with_cache_dir(config.cache.dir.clone());
        let event_loop = coordinator.start(events);

        info!(
            "HTTP coordinator ready (temp dir {}, default policy {})",
            config.transport.temp_dir.display(),
            config.placement.default_policy
        );
        Ok((coordinator, event_loop))
    }
}

/// Routes one event to the registry and, for completions, the placer.
async fn dispatch<P: Placer + ?Sized>(
    registry: &TaskRegistry,
    placer: &P,
    event: TransportEvent,
) -> Result<(), DownloadError> {
    let task_id = event.task_id;

    let kind = match event.kind {
        TransportEventKind::Progress(progress) => {
            if !registry.report_progress(task_id, progress) {
                trace!("Progress for task {} with no pending download", task_id);
            }
            return Ok(());
        }
        terminal => terminal,
    };

    let Some(entry) = registry.resolve(task_id) else {
        metrics::UNREGISTERED_COMPLETIONS.inc();
        return Err(DownloadError::UnregisteredTask(task_id));
    };

    let result = match kind {
        TransportEventKind::Completed { temp_path } => {
            let started = Instant::now();
            let placed = placer
                .place(PlacementRequest::new(
                    temp_path.clone(),
                    entry.destination.clone(),
                    entry.policy,
                ))
                .await;
            metrics::PLACEMENT_DURATION
                .with_label_values(&[entry.policy.as_str()])
                .observe(started.elapsed().as_secs_f64());

            if let Ok(PlacementOutcome::Skipped { .. }) = &placed {
                discard_payload(&temp_path).await;
            }
            placed.map_err(DownloadError::from)
        }
        TransportEventKind::Failed { error } => Err(DownloadError::Transport(error)),
        TransportEventKind::Progress(_) => return Ok(()),
    };

    match &result {
        Ok(outcome) => {
            metrics::DOWNLOADS_COMPLETED
                .with_label_values(&[outcome.label()])
                .inc();
            info!(
                "Task {} {} at {} after {}ms",
                task_id,
                outcome.label(),
                outcome.path().display(),
                entry.elapsed_ms()
            );
        }
        Err(e) => {
            metrics::DOWNLOADS_FAILED
                .with_label_values(&[e.stage()])
                .inc();
            error!(
                "Task {} for {} failed: {}",
                task_id,
                entry.destination.display(),
                e
            );
        }
    }

    if !entry.complete(result) {
        debug!("Nobody is waiting on task {}", task_id);
    }

    Ok(())
}

/// Removes the payload of a skipped download.
async fn discard_payload(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Discarded payload {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to discard payload {}: {}", path.display(), e),
    }
}
