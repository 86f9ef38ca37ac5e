use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stowaway_core::{
    load_config, load_config_from_env, validate_config, Config, DownloadCoordinator,
    OverwritePolicy, PlacementOutcome, TaskId,
};

/// Download a file and move it into place.
#[derive(Debug, Parser)]
#[command(name = "stowaway", version, about)]
struct Cli {
    /// Configuration file; defaults and STOWAWAY_* variables are used when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// What to do when the destination already exists (keep, overwrite, rename)
    #[arg(long, short)]
    policy: Option<OverwritePolicy>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,

    /// URL to download
    url: String,

    /// Where to place the downloaded file
    dest: PathBuf,
}

/// Outcome printed with `--json`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    task_id: TaskId,
    url: &'a str,
    #[serde(flatten)]
    outcome: &'a PlacementOutcome,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,stowaway_core=info".into()),
        )
        .with(
            cli.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.log_json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    let config = load(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let policy = cli.policy.unwrap_or(config.placement.default_policy);
    let (coordinator, _event_loop) =
        DownloadCoordinator::spawn_http(&config).context("Failed to start transport")?;

    let handle = coordinator
        .begin_download(&cli.url, &cli.dest, policy)
        .await
        .with_context(|| format!("Failed to start download of {}", cli.url))?;
    let task_id = handle.task_id();

    let mut progress = handle.progress();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = *progress.borrow_and_update();
            match p.fraction() {
                Some(f) => debug!("{} bytes ({:.0}%)", p.transferred, f * 100.0),
                None => debug!("{} bytes", p.transferred),
            }
        }
    });

    let outcome = handle
        .wait()
        .await
        .with_context(|| format!("Download of {} failed", cli.url))?;

    if cli.json {
        let report = Report {
            task_id,
            url: &cli.url,
            outcome: &outcome,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", describe(&outcome));
    }

    Ok(())
}

fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_config_from_env().context("Failed to load config from environment"),
    }
}

fn describe(outcome: &PlacementOutcome) -> String {
    match outcome {
        PlacementOutcome::Placed { path } => format!("saved {}", path.display()),
        PlacementOutcome::Skipped { existing } => {
            format!("kept existing {}", existing.display())
        }
    }
}
