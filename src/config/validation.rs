use crate::config::types::{
    Config, FetchConfig, OutputConfig, PoolConfig, SourceConfig, PAGE_PLACEHOLDER,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_fetch_config(&config.fetch)?;
    validate_pool_config(&config.pool)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates listing source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if !config.base_url.contains(PAGE_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "base_url must contain the '{}' placeholder, got '{}'",
            PAGE_PLACEHOLDER, config.base_url
        )));
    }

    // Substitute a page number and make sure the result is a fetchable URL
    let probe = config.base_url.replace(PAGE_PLACEHOLDER, "1");
    let url = Url::parse(&probe)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", probe, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    validate_selector(&config.ready_marker, "ready_marker")?;

    if config.first_page < 1 {
        return Err(ConfigError::Validation(format!(
            "first_page must be >= 1, got {}",
            config.first_page
        )));
    }

    if config.last_page < config.first_page {
        return Err(ConfigError::Validation(format!(
            "last_page must be >= first_page, got {}..{}",
            config.first_page, config.last_page
        )));
    }

    Ok(())
}

/// Validates fetch behavior configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.load_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "load_timeout_ms must be >= 100ms, got {}ms",
            config.load_timeout_ms
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.poll_interval_ms > config.load_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms ({}ms) cannot exceed load_timeout_ms ({}ms)",
            config.poll_interval_ms, config.load_timeout_ms
        )));
    }

    if config.attempts < 1 || config.attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "attempts must be between 1 and 10, got {}",
            config.attempts
        )));
    }

    Ok(())
}

/// Validates worker pool configuration
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    // workers == 0 means auto-detect, so only the upper bound is checked
    if config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 0 and 100, got {}",
            config.workers
        )));
    }

    Ok(())
}

/// Validates output file configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.prefix.is_empty() {
        return Err(ConfigError::Validation(
            "output prefix cannot be empty".to_string(),
        ));
    }

    // The prefix becomes part of a filename, so path separators are rejected
    if !config
        .prefix
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "output prefix must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.prefix
        )));
    }

    Ok(())
}

/// Validates that a string parses as a CSS selector
fn validate_selector(selector: &str, field: &str) -> Result<(), ConfigError> {
    if selector.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} cannot be empty",
            field
        )));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("{} is not a valid CSS selector: {}", field, e))
    })?;

    Ok(())
}
