//! Configuration validation logic
//!
//! Checks settings before any connection is attempted, so misconfiguration
//! is reported with the offending field name.

use crate::cache::ConnectionTarget;
use crate::config::error::ConfigError;
use crate::config::settings::{LoggerSettings, Settings, StoreSettings};
use crate::logger::VALID_LOG_LEVELS;

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl StoreSettings {
    /// Validate store configuration
    ///
    /// # Validation Rules
    /// - Address, when present, must parse as `[redis://][host][:port][/database]`
    /// - Pool size must be greater than 0
    /// - Connection timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(address) = &self.address {
            ConnectionTarget::parse(Some(address))
                .map_err(|e| ConfigError::validation("store.address", e.to_string()))?;
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "store.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "store.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings, returning the first error encountered
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}
