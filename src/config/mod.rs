//! Configuration management for signalspool
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use signalspool::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Store directory: {}", config.storage.directory.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SIGNALSPOOL__<section>__<key>`
//!
//! Examples:
//! - `SIGNALSPOOL__STORAGE__TTL_SECS=3600`
//! - `SIGNALSPOOL__QUEUE__BUFFER_SIZE=8MB`
//! - `SIGNALSPOOL__SERVER__BIND_ADDR=0.0.0.0:9095`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/signalspool.toml`.
//! This can be overridden using the `SIGNALSPOOL_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, EvictionConfig, QueueConfig, ServerConfig, StorageConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the default sources
    pub fn load_or_default_path(path: Option<std::path::PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }
}
