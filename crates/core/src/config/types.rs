use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::placer::PlacerConfig;
use crate::transport::HttpTransportConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub transport: HttpTransportConfig,
    #[serde(default)]
    pub placement: PlacerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Cache configuration for in-memory fetches
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("stowaway-cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placer::OverwritePolicy;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.transport.timeout_secs, 300);
        assert_eq!(config.placement.default_policy, OverwritePolicy::Rename);
        assert_eq!(config.placement.suffix_len, 7);
        assert!(config.cache.dir.ends_with("stowaway-cache"));
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[transport]
temp_dir = "/var/tmp/stowaway"
timeout_secs = 60
user_agent = "test-agent"
event_buffer = 16

[placement]
default_policy = "keep"
max_rename_attempts = 4
buffer_size = 65536
serialize_destinations = false

[cache]
dir = "/var/cache/stowaway"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.transport.temp_dir.to_str().unwrap(), "/var/tmp/stowaway");
        assert_eq!(config.transport.timeout_secs, 60);
        assert_eq!(config.transport.user_agent, "test-agent");
        assert_eq!(config.transport.event_buffer, 16);
        assert_eq!(config.placement.default_policy, OverwritePolicy::Keep);
        assert_eq!(config.placement.max_rename_attempts, 4);
        assert_eq!(config.placement.buffer_size, 65536);
        assert!(!config.placement.serialize_destinations);
        // Unset fields keep their defaults
        assert_eq!(config.placement.suffix_len, 7);
        assert_eq!(config.cache.dir.to_str().unwrap(), "/var/cache/stowaway");
    }

    #[test]
    fn test_deserialize_unknown_policy_fails() {
        let toml = r#"
[placement]
default_policy = "replace"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
