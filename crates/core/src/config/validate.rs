use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upstream URL is http(s) and the timeout is positive
/// - Cache path is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let url = config.upstream.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "upstream.url must be an http(s) URL, got '{}'",
            config.upstream.url
        )));
    }

    if config.upstream.timeout == 0 {
        return Err(ConfigError::ValidationError(
            "upstream.timeout must be at least 1 second".to_string(),
        ));
    }

    if config.upstream.cache.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.cache cannot be empty".to_string(),
        ));
    }

    Ok(())
}
