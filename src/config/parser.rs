use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, parses, and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - The validated configuration
/// * `Err(ConfigError)` - The file was unreadable, malformed, or invalid
///
/// # Example
///
/// ```no_run
/// use newsrake::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("newsrake.toml")).unwrap();
/// assert!(config.source.base_url.contains("{page}"));
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Loads a configuration file and fingerprints its content
///
/// The fingerprint is the hex SHA-256 of the raw file, logged at startup
/// so runs can be tied back to the exact configuration that produced
/// them. The file is read once; hash and config come from the same bytes.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - The validated configuration and its fingerprint
/// * `Err(ConfigError)` - The file was unreadable, malformed, or invalid
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, content_hash(&content)))
}

/// Parses and validates configuration text
///
/// Missing sections and fields fall back to the built-in defaults.
fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 fingerprint of the configuration text
fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
