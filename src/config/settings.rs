//! Configuration settings structures for redis-store
//!
//! This module defines the configuration structures that can be loaded from
//! TOML files and environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CONNECTION_TIMEOUT, DEFAULT_POOL_SIZE, StoreOptions};
use crate::config::error::ConfigError;
use crate::logger::{LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_connection_timeout() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Store Configuration
// ============================================================================

/// Key-value server backing the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Cache store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Backend type
    #[serde(default)]
    pub backend: StoreBackend,

    /// Address as `[redis://][host][:port][/database]`; defaults to `localhost:6379/0`
    #[serde(default)]
    pub address: Option<String>,

    /// Logical database, overriding the one in `address`
    #[serde(default)]
    pub database: Option<u32>,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            address: None,
            database: None,
            pool_size: default_pool_size(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

impl StoreSettings {
    /// Construction options carried by these settings
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            database: self.database,
            pool_size: self.pool_size,
            connection_timeout: Duration::from_secs(self.connection_timeout),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            colored: default_true(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to LoggerConfig
    ///
    /// This method transforms the configuration file representation into
    /// the runtime LoggerConfig used by the logger module.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.format", e.to_string()))?;

        LoggerConfig::new(self.level, format, self.colored)
            .map_err(|e| ConfigError::validation("logger.level", e.to_string()))
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Cache store configuration
    #[serde(default)]
    pub store: StoreSettings,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,
}
