//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding one JSON file per collection
    pub data_dir: PathBuf,
    /// Pretty-print collection files (two-space indent)
    pub pretty: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            pretty: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue(format!(
                "LOG_FORMAT must be 'compact' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Fallback filter used when RUST_LOG is unset
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info,guild_governance=debug".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = StorageConfig {
            data_dir: lookup("DATA_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| StorageConfig::default().data_dir),
            pretty: match lookup("STORAGE_PRETTY") {
                Some(v) => parse_bool("STORAGE_PRETTY", &v)?,
                None => StorageConfig::default().pretty,
            },
        };

        let logging = LoggingConfig {
            default_filter: LoggingConfig::default().default_filter,
            format: match lookup("LOG_FORMAT") {
                Some(v) => v.parse()?,
                None => LogFormat::Compact,
            },
        };

        Ok(Self { storage, logging })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
