use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Transport timeout and event buffer are not 0
/// - Rename suffix length and attempt count are not 0
/// - Copy buffer size is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.transport.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "transport.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.transport.event_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "transport.event_buffer cannot be 0".to_string(),
        ));
    }

    if config.placement.suffix_len == 0 {
        return Err(ConfigError::ValidationError(
            "placement.suffix_len cannot be 0".to_string(),
        ));
    }

    if config.placement.max_rename_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "placement.max_rename_attempts cannot be 0".to_string(),
        ));
    }

    if config.placement.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "placement.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.transport.timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_validate_zero_suffix_fails() {
        let mut config = Config::default();
        config.placement.suffix_len = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("suffix_len"));
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = Config::default();
        config.placement.max_rename_attempts = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
