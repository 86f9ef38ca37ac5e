//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the transport and placer
//! traits, so the coordinator can be exercised deterministically by injecting
//! synthetic transport events instead of talking to a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use stowaway_core::testing::{MockPlacer, MockTransport};
//!
//! let (transport, events) = MockTransport::new();
//! let placer = MockPlacer::new();
//!
//! // Build a coordinator, start it with `events`, then:
//! transport.complete(task_id, "/tmp/payload").await;
//! ```

mod mock_placer;
mod mock_transport;

pub use mock_placer::{MockPlacer, RecordedPlacement};
pub use mock_transport::{MockTaskState, MockTransport, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Write `content` to `dir/name` and return the path, standing in for a
    /// payload the transport finished downloading.
    pub fn payload(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write test payload");
        path
    }

    /// Names of the entries in `dir`, sorted.
    pub fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("Failed to read test directory")
            .map(|entry| {
                entry
                    .expect("Failed to read directory entry")
                    .file_name()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }
}
