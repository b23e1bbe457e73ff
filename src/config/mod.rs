//! Configuration management for logkeeper
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use logkeeper::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Rules configured: {}", config.processor.rules.len());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LOGKEEPER__<section>__<key>`
//!
//! Examples:
//! - `LOGKEEPER__PROCESSOR__AUTO_INTERVAL=1h`
//! - `LOGKEEPER__PROCESSOR__ARCHIVE_ON_STARTUP=true`
//! - `LOGKEEPER__LOGGING__FILTER=logkeeper=debug`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/logkeeper.toml`.
//! This can be overridden using the `LOGKEEPER_CONFIG` environment variable.
//! Relative rule paths are resolved against the directory holding the file.

mod handle;
mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use handle::ConfigHandle;
pub use models::{
    Config, LoggingConfig, MATCH_ALL_PATTERN, MonitoringMode, ProcessorConfig, RetentionRule,
};
pub use sources::{default_config_path, resolve_rule_paths};
pub use validation::{ValidationError, validate};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(std::path::PathBuf),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`LOGKEEPER__*`)
    /// 2. TOML file (default: `config/logkeeper.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (relative or overlapping paths, bad patterns, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config.processor)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config.processor)?;
        Ok(config)
    }

    /// Load configuration from a file that must exist
    ///
    /// Unlike [`Config::load_from_path`], a missing file is an error rather
    /// than a fallback to defaults. Used for paths given on the command line.
    pub fn load_file(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path));
        }
        Self::load_from_path(path)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
