//! Configuration module for Newsrake
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every field has a built-in default matching the public Hacker News listing,
//! so a configuration file is optional.
//!
//! # Example
//!
//! ```no_run
//! use newsrake::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Harvesting pages {}..{}", config.source.first_page, config.source.last_page);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, OutputConfig, PoolConfig, SourceConfig, PAGE_PLACEHOLDER,
};

// Re-export parser functions
pub use parser::{load_config, load_config_with_hash};
