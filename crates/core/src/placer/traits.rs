//! Trait definitions for the placer module.

use async_trait::async_trait;

use super::error::PlacerError;
use super::types::{PlacementOutcome, PlacementRequest};

/// A placer that moves finished payloads to their destinations.
#[async_trait]
pub trait Placer: Send + Sync {
    /// Returns the name of this placer implementation.
    fn name(&self) -> &str;

    /// Applies the request's overwrite policy and moves the payload.
    ///
    /// Failures are reported once and never retried; the source may or may
    /// not still exist afterwards.
    async fn place(&self, request: PlacementRequest) -> Result<PlacementOutcome, PlacerError>;
}
