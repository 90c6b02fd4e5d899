use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Catalog document name is not empty
/// - Fetch timeout and sweep width are non-zero
/// - Sweep interval is non-zero when the scheduler is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.catalog.document_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.document_name cannot be empty".to_string(),
        ));
    }

    if config.hosting.fetch_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "hosting.fetch_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.hosting.manifest_path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "hosting.manifest_path cannot be empty".to_string(),
        ));
    }

    if config.sweep.max_concurrent_fetches == 0 {
        return Err(ConfigError::ValidationError(
            "sweep.max_concurrent_fetches cannot be 0".to_string(),
        ));
    }

    if config.sweep.enabled && config.sweep.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sweep.interval_secs cannot be 0 when the sweep is enabled".to_string(),
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
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.hosting.fetch_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = Config::default();
        config.sweep.max_concurrent_fetches = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_interval_only_matters_when_enabled() {
        let mut config = Config::default();
        config.sweep.interval_secs = 0;
        assert!(validate_config(&config).is_ok());

        config.sweep.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
