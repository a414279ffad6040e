use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Dispatcher sizes (workers, permits, stations, time unit) are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    config
        .dispatcher
        .validate()
        .map_err(ConfigError::ValidationError)?;

    Ok(())
}
