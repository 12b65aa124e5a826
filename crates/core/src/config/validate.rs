use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Fetch timeout and chunk size are positive
/// - Default conversion options are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.fetch.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "fetch.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.fetch.chunk_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "fetch.chunk_size_bytes cannot be 0".to_string(),
        ));
    }

    config
        .conversion
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("conversion: {}", e)))?;

    Ok(())
}
