//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download lifecycle (started, completed, failed, cancelled)
//! - Registry anomalies (events for unregistered tasks)
//! - Placement duration by policy

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Downloads
// =============================================================================

/// Downloads started total.
pub static DOWNLOADS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("stowaway_downloads_started_total", "Total downloads started").unwrap()
});

/// Downloads that ended with a placement outcome.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stowaway_downloads_completed_total",
            "Total downloads concluded successfully",
        ),
        &["outcome"], // "placed", "skipped"
    )
    .unwrap()
});

/// Downloads that failed.
pub static DOWNLOADS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stowaway_downloads_failed_total", "Total downloads that failed"),
        &["stage"], // "transport", "placement"
    )
    .unwrap()
});

/// Downloads cancelled by the caller.
pub static DOWNLOADS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stowaway_downloads_cancelled_total",
        "Total downloads cancelled before completion",
    )
    .unwrap()
});

// =============================================================================
// Registry
// =============================================================================

/// Terminal events that matched no registry entry.
pub static UNREGISTERED_COMPLETIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stowaway_unregistered_completions_total",
        "Completion events for tasks with no pending download",
    )
    .unwrap()
});

// =============================================================================
// Placement
// =============================================================================

/// Placement duration in seconds.
pub static PLACEMENT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stowaway_placement_duration_seconds",
            "Duration of payload placement",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["policy"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOADS_FAILED.clone()),
        Box::new(DOWNLOADS_CANCELLED.clone()),
        Box::new(UNREGISTERED_COMPLETIONS.clone()),
        Box::new(PLACEMENT_DURATION.clone()),
    ]
}

/// Registers every core metric with `registry`.
pub fn register_metrics(registry: &prometheus::Registry) -> prometheus::Result<()> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}
