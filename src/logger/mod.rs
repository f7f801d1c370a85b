//! Logger Module
//!
//! Installs a `tracing-subscriber` registry for applications embedding the
//! cache store:
//! - Level filtering through `EnvFilter`
//! - Full, Compact, or JSON output
//! - ANSI colors only when requested and stdout is a terminal

pub mod config;
pub mod error;


// Re-export main types
pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber with the given configuration
///
/// Fails if the configuration is invalid or a global subscriber is already set.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    config.validate()?;

    // Create filter from level string
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let use_ansi = config.colored && std::io::stdout().is_terminal();

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Full => registry
            .with(
                fmt::layer()
                    .with_ansi(use_ansi)
                    .with_target(true)
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_ansi(use_ansi)
                    .with_target(true)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_ansi(false).json())
            .try_init(),
    };

    result.map_err(|e| LoggerError::subscriber(e.to_string()))?;
    tracing::debug!(
        level = %config.level,
        format = config.format.as_str(),
        "Logger initialized"
    );
    Ok(())
}
