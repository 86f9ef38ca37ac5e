//! Configuration for the placer module.

use serde::{Deserialize, Serialize};

use super::types::OverwritePolicy;

/// Configuration for the file system placer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacerConfig {
    /// Policy used when a caller does not choose one.
    #[serde(default = "default_policy")]
    pub default_policy: OverwritePolicy,

    /// Number of letters in a generated rename suffix.
    #[serde(default = "default_suffix_len")]
    pub suffix_len: usize,

    /// How many alternate names to try before giving up on a rename.
    #[serde(default = "default_max_rename_attempts")]
    pub max_rename_attempts: u32,

    /// Buffer size for cross-device copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Serialize placements that target the same destination path.
    #[serde(default = "default_true")]
    pub serialize_destinations: bool,
}

fn default_policy() -> OverwritePolicy {
    OverwritePolicy::Rename
}

fn default_suffix_len() -> usize {
    7
}

fn default_max_rename_attempts() -> u32 {
    16
}

fn default_buffer_size() -> usize {
    8 * 1024 * 1024 // 8 MB
}

fn default_true() -> bool {
    true
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            suffix_len: default_suffix_len(),
            max_rename_attempts: default_max_rename_attempts(),
            buffer_size: default_buffer_size(),
            serialize_destinations: true,
        }
    }
}

impl PlacerConfig {
    /// Sets the policy used when none is given.
    pub fn with_default_policy(mut self, policy: OverwritePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Sets the number of rename attempts.
    pub fn with_max_rename_attempts(mut self, attempts: u32) -> Self {
        self.max_rename_attempts = attempts;
        self
    }

    /// Sets the buffer size for copies.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enables or disables per-destination serialization.
    pub fn with_serialized_destinations(mut self, enabled: bool) -> Self {
        self.serialize_destinations = enabled;
        self
    }
}
