//! Newsrake: a concurrent news listing harvester
//!
//! This crate fetches paginated listing pages from a news site in parallel,
//! extracts story records from the markup, and appends them to a shared
//! timestamped CSV file.

pub mod config;
pub mod harvest;
pub mod sink;

use thiserror::Error;

/// Main error type for Newsrake operations
#[derive(Debug, Error)]
pub enum RakeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] harvest::FetchError),

    #[error("Output error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client setup failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Invalid config URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Newsrake operations
pub type Result<T> = std::result::Result<T, RakeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{
    extract_stories, run_fixture, run_harvest, AbortHandle, PageFetcher, RawPage, RunResult, Story,
};
pub use sink::{timestamped_filename, CsvSink, RecordSink};
