use crate::config::types::{ApiConfig, Config, CrawlerConfig, CredentialsConfig, OutputConfig};
use crate::ConfigError;

/// Validates the entire configuration
///
/// Target lists are not checked here: their shape is the orchestrator's
/// precondition and is reported through `CrawlError`.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    validate_credentials(&config.credentials)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.concurrency < 1 || config.concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 256, got {}",
            config.concurrency
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1 second".to_string(),
        ));
    }

    if config.connect_timeout < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates the API shape
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if config.per_page < 1 || config.per_page > 1000 {
        return Err(ConfigError::Validation(format!(
            "per-page must be between 1 and 1000, got {}",
            config.per_page
        )));
    }

    if config.auth_scheme.is_empty() || config.auth_scheme.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "auth-scheme must be a single non-empty word, got '{}'",
            config.auth_scheme
        )));
    }

    if config.rate_limit_poll_interval < 1 {
        return Err(ConfigError::Validation(
            "rate-limit-poll-interval must be >= 1ms".to_string(),
        ));
    }

    validate_header_name("remaining-header", &config.remaining_header)?;
    validate_header_name("reset-header", &config.reset_header)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.log_path.is_empty() {
        return Err(ConfigError::Validation(
            "log-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates configured tokens
///
/// An empty pool is allowed here because tokens may come from the command
/// line instead.
fn validate_credentials(config: &CredentialsConfig) -> Result<(), ConfigError> {
    if let Some(position) = config.tokens.iter().position(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "credential token #{} is empty",
            position
        )));
    }
    Ok(())
}

/// Header names must be visible ASCII without separators
fn validate_header_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
        return Err(ConfigError::Validation(format!(
            "{} is not a valid header name: '{}'",
            field, name
        )));
    }
    Ok(())
}
