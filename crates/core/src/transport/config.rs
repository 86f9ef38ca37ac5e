//! Configuration for the HTTP transport.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`HttpTransport`](super::HttpTransport).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Directory where in-flight payloads are written before placement.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capacity of the event channel between transport and coordinator.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("stowaway")
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("stowaway/{}", env!("CARGO_PKG_VERSION"))
}

fn default_event_buffer() -> usize {
    256
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl HttpTransportConfig {
    /// Sets the temporary payload directory.
    pub fn with_temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_dir = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
