//! End-to-end tests against a loopback HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tempfile::TempDir;

use stowaway_core::{
    testing::fixtures, CacheConfig, Config, DownloadCoordinator, DownloadError, FsPlacer,
    HttpTransport, HttpTransportConfig, OverwritePolicy, PlacementOutcome, TransportError,
};

const WAIT: Duration = Duration::from_secs(10);
const REPORT: &[u8] = b"%PDF-1.7 quarterly numbers";

/// Serves a few fixed routes on an ephemeral port.
async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/files/report.pdf", get(|| async { REPORT }))
        .route(
            "/files/large.bin",
            get(|| async { vec![7u8; 256 * 1024] }),
        )
        .route(
            "/files/missing.pdf",
            get(|| async { (StatusCode::NOT_FOUND, "no such file") }),
        )
        .route(
            "/files/slow.bin",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind loopback listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Temp and cache directories plus a place for outputs.
struct Dirs {
    temp: TempDir,
    cache: TempDir,
    target: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
            target: TempDir::new().unwrap(),
        }
    }

    fn config(&self) -> Config {
        Config {
            transport: HttpTransportConfig::default()
                .with_temp_dir(self.temp.path())
                .with_timeout_secs(20),
            cache: CacheConfig {
                dir: self.cache.path().to_path_buf(),
            },
            ..Default::default()
        }
    }
}

fn coordinator(dirs: &Dirs) -> DownloadCoordinator<HttpTransport, FsPlacer> {
    let (coordinator, _event_loop) =
        DownloadCoordinator::spawn_http(&dirs.config()).expect("Failed to build coordinator");
    coordinator
}

#[tokio::test]
async fn test_download_is_placed_at_destination() {
    let addr = spawn_server().await;
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);
    let dest = dirs.target.path().join("report.pdf");

    let handle = coordinator
        .begin_download(
            &format!("http://{}/files/report.pdf", addr),
            &dest,
            OverwritePolicy::Overwrite,
        )
        .await
        .unwrap();

    let outcome = tokio::time::timeout(WAIT, handle.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, PlacementOutcome::Placed { path: dest.clone() });
    assert_eq!(std::fs::read(&dest).unwrap(), REPORT);

    // The temporary payload was moved, not copied.
    assert!(fixtures::dir_entries(dirs.temp.path()).is_empty());
    assert_eq!(coordinator.pending(), 0);
}

#[tokio::test]
async fn test_keep_discards_second_payload() {
    let addr = spawn_server().await;
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);
    let dest = fixtures::payload(dirs.target.path(), "report.pdf", b"local copy");

    let handle = coordinator
        .begin_download(
            &format!("http://{}/files/report.pdf", addr),
            &dest,
            OverwritePolicy::Keep,
        )
        .await
        .unwrap();

    let outcome = tokio::time::timeout(WAIT, handle.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_skipped());
    assert_eq!(std::fs::read(&dest).unwrap(), b"local copy");
    assert!(fixtures::dir_entries(dirs.temp.path()).is_empty());
}

#[tokio::test]
async fn test_progress_reaches_total() {
    let addr = spawn_server().await;
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);

    let handle = coordinator
        .begin_download(
            &format!("http://{}/files/large.bin", addr),
            dirs.target.path().join("large.bin"),
            OverwritePolicy::Rename,
        )
        .await
        .unwrap();
    let progress = handle.progress();

    let outcome = tokio::time::timeout(WAIT, handle.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_placed());
    assert_eq!(std::fs::metadata(outcome.path()).unwrap().len(), 256 * 1024);

    // Updates may be dropped, but whatever arrived is bounded by the body.
    let last = *progress.borrow();
    assert!(last.transferred <= 256 * 1024);
    if let Some(total) = last.total {
        assert_eq!(total, 256 * 1024);
    }
}

#[tokio::test]
async fn test_http_error_status_fails_download() {
    let addr = spawn_server().await;
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);
    let dest = dirs.target.path().join("missing.pdf");

    let handle = coordinator
        .begin_download(
            &format!("http://{}/files/missing.pdf", addr),
            &dest,
            OverwritePolicy::Overwrite,
        )
        .await
        .unwrap();

    let err = tokio::time::timeout(WAIT, handle.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        DownloadError::Transport(TransportError::HttpStatus { status: 404, .. })
    ));
    assert!(!dest.exists());
    assert!(fixtures::dir_entries(dirs.temp.path()).is_empty());
}

#[tokio::test]
async fn test_cancel_stops_running_download() {
    let addr = spawn_server().await;
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);
    let dest = dirs.target.path().join("slow.bin");

    let handle = coordinator
        .begin_download(
            &format!("http://{}/files/slow.bin", addr),
            &dest,
            OverwritePolicy::Overwrite,
        )
        .await
        .unwrap();
    let task_id = handle.task_id();

    // The partial payload exists as soon as the transfer is running.
    let parts = fixtures::dir_entries(dirs.temp.path());
    assert_eq!(parts.len(), 1);
    assert!(parts[0].ends_with(".part"));

    assert!(coordinator.cancel(task_id).await);
    assert_eq!(coordinator.transport().active_tasks(), 0);
    assert!(fixtures::dir_entries(dirs.temp.path()).is_empty());

    let err = tokio::time::timeout(WAIT, handle.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, DownloadError::Cancelled));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_fetch_returns_body_and_cleans_cache() {
    let addr = spawn_server().await;
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);

    let body = tokio::time::timeout(
        WAIT,
        coordinator.fetch(&format!("http://{}/files/report.pdf", addr)),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(&body[..], REPORT);
    assert!(fixtures::dir_entries(dirs.cache.path()).is_empty());
}

#[tokio::test]
async fn test_unreachable_host_fails() {
    let dirs = Dirs::new();
    let coordinator = coordinator(&dirs);

    // Bind and immediately drop a listener to get a closed port.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = coordinator
        .fetch(&format!("http://{}/nothing", addr))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DownloadError::Transport(TransportError::ConnectionFailed(_))
    ));
}

#[tokio::test]
async fn test_failed_start_releases_transport_task() {
    let dirs = Dirs::new();
    // A temp dir below a regular file can never be created.
    let blocker = fixtures::payload(dirs.temp.path(), "blocker", b"");
    let mut config = dirs.config();
    config.transport = config.transport.with_temp_dir(blocker.join("parts"));
    let (coordinator, _event_loop) = DownloadCoordinator::spawn_http(&config).unwrap();

    for i in 0..3 {
        let err = coordinator
            .begin_download(
                "http://127.0.0.1:9/files/report.pdf",
                dirs.target.path().join(format!("report-{}.pdf", i)),
                OverwritePolicy::Overwrite,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Transport(TransportError::Storage(_))
        ));
    }

    assert_eq!(coordinator.pending(), 0);
    assert_eq!(coordinator.transport().active_tasks(), 0);
}
