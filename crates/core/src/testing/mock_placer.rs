//! Mock placer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::placer::{PlacementOutcome, PlacementRequest, Placer, PlacerError};

/// A recorded placement for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPlacement {
    /// The request that was submitted.
    pub request: PlacementRequest,
    /// Whether the placement succeeded.
    pub success: bool,
}

/// Mock implementation of the Placer trait.
///
/// Never touches the filesystem. Provides controllable behavior for testing:
/// - Track placement requests for assertions
/// - Simulate failures
/// - Simulate slow placements
///
/// # Example
///
/// ```rust,ignore
/// use stowaway_core::testing::MockPlacer;
///
/// let placer = MockPlacer::new();
/// placer.set_next_error(PlacerError::SourceMissing { path }).await;
///
/// // ... drive the coordinator ...
///
/// assert_eq!(placer.placement_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockPlacer {
    /// Recorded placements.
    placements: Arc<RwLock<Vec<RecordedPlacement>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<PlacerError>>>,
    /// If true, every placement reports the destination as kept.
    skip_all: Arc<RwLock<bool>>,
    /// Simulated placement duration in milliseconds.
    placement_duration_ms: Arc<RwLock<u64>>,
}

impl Default for MockPlacer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlacer {
    /// Create a new mock placer.
    pub fn new() -> Self {
        Self {
            placements: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            skip_all: Arc::new(RwLock::new(false)),
            placement_duration_ms: Arc::new(RwLock::new(0)),
        }
    }

    /// Get all recorded placements.
    pub async fn recorded_placements(&self) -> Vec<RecordedPlacement> {
        self.placements.read().await.clone()
    }

    /// Get the number of placements performed.
    pub async fn placement_count(&self) -> usize {
        self.placements.read().await.len()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: PlacerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Report every destination as already present and kept.
    pub async fn set_skip_all(&self, skip: bool) {
        *self.skip_all.write().await = skip;
    }

    /// Set the simulated placement duration.
    pub async fn set_placement_duration(&self, duration: Duration) {
        *self.placement_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<PlacerError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Placer for MockPlacer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn place(&self, request: PlacementRequest) -> Result<PlacementOutcome, PlacerError> {
        let duration_ms = *self.placement_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        if let Some(err) = self.take_error().await {
            self.placements.write().await.push(RecordedPlacement {
                request,
                success: false,
            });
            return Err(err);
        }

        let outcome = if *self.skip_all.read().await {
            PlacementOutcome::Skipped {
                existing: request.destination.clone(),
            }
        } else {
            PlacementOutcome::Placed {
                path: request.destination.clone(),
            }
        };

        self.placements.write().await.push(RecordedPlacement {
            request,
            success: true,
        });

        Ok(outcome)
    }
}
