//! Structured logging setup.
//!
//! The router only emits `tracing` events; installing a subscriber is left to the
//! embedding application. [`init_logging`] is a ready-made one: JSON lines for
//! production, pretty output for development, filtered by an `EnvFilter`.
//!
//! | Variable                      | Default | Meaning                           |
//! |-------------------------------|---------|-----------------------------------|
//! | `CHAINR_LOG_LEVEL`            | `info`  | level or full filter directive    |
//! | `CHAINR_LOG_FORMAT`           | `json`  | `json` or `pretty`                |
//! | `CHAINR_LOG_INCLUDE_LOCATION` | `false` | add file and line to every event  |
//!
//! `RUST_LOG`, when set, takes precedence over `CHAINR_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level name (`info`) or `EnvFilter` directives (`chainrouter=debug,warn`)
    pub log_level: String,
    pub format: LogFormat,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            include_location: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("CHAINR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("CHAINR_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            include_location: env::var("CHAINR_LOG_INCLUDE_LOCATION")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Pretty output at debug level.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
        }
    }
}

/// Install a global `tracing` subscriber built from `config`.
///
/// # Errors
///
/// Fails when the level is not a valid filter or a global subscriber is already
/// installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log level `{}`", config.log_level))?,
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
