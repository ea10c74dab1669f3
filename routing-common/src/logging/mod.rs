//! Standardized logging configuration.
//!
//! Consistent `tracing` output for the router library and CLI:
//! - Human-readable console output (default)
//! - Compact single-line format
//! - JSON format for log aggregation
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard tracing filter (e.g. `info`, `routing_common=debug`)
//! - `LOG_FORMAT`: output format - `pretty` (default), `compact`, or `json`
//! - `LOG_TIMESTAMPS`: timestamp format - `local` (default), `utc`, or `none`
//! - `LOG_LEVEL`: default level when `RUST_LOG` is not set

use std::env;

use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %z";
const UTC_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with colors (default for terminals)
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for machine parsing
    Json,
}

impl LogFormat {
    /// Parse format from string, defaulting to pretty
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Timestamp format for log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// Local time with timezone (default)
    #[default]
    Local,
    /// UTC time (ISO 8601)
    Utc,
    /// No timestamps
    None,
}

impl TimestampFormat {
    /// Parse format from string, defaulting to local
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "utc" => TimestampFormat::Utc,
            "none" | "off" => TimestampFormat::None,
            _ => TimestampFormat::Local,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (pretty, compact, json)
    pub format: LogFormat,
    /// Timestamp format
    pub timestamps: TimestampFormat,
    /// Default log level filter when RUST_LOG is not set
    pub default_level: String,
    /// Include source file location
    pub include_location: bool,
    /// Include target (module path)
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            timestamps: TimestampFormat::Local,
            default_level: "info".to_string(),
            include_location: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Create config from `LOG_FORMAT`, `LOG_TIMESTAMPS`, `LOG_LEVEL`,
    /// and `LOG_LOCATION`.
    pub fn from_env() -> Self {
        Self {
            format: env::var("LOG_FORMAT")
                .map(|s| LogFormat::from_str(&s))
                .unwrap_or_default(),
            timestamps: env::var("LOG_TIMESTAMPS")
                .map(|s| TimestampFormat::from_str(&s))
                .unwrap_or_default(),
            default_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            include_location: env::var("LOG_LOCATION")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            include_target: true,
        }
    }

    /// Set the default log level
    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

/// Initialize logging with the given configuration.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let layer = fmt::layer()
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_ansi(atty::is(atty::Stream::Stdout));

    match config.format {
        LogFormat::Json => {
            let layer = layer.json();
            match config.timestamps {
                TimestampFormat::Local => registry
                    .with(layer.with_timer(ChronoLocal::new(LOCAL_TIME_FORMAT.to_string())))
                    .try_init()?,
                TimestampFormat::Utc => registry
                    .with(layer.with_timer(ChronoUtc::new(UTC_TIME_FORMAT.to_string())))
                    .try_init()?,
                TimestampFormat::None => registry.with(layer.without_time()).try_init()?,
            }
        }
        LogFormat::Compact => {
            let layer = layer.compact();
            match config.timestamps {
                TimestampFormat::Local => registry
                    .with(layer.with_timer(ChronoLocal::new(LOCAL_TIME_FORMAT.to_string())))
                    .try_init()?,
                TimestampFormat::Utc => registry
                    .with(layer.with_timer(ChronoUtc::new(UTC_TIME_FORMAT.to_string())))
                    .try_init()?,
                TimestampFormat::None => registry.with(layer.without_time()).try_init()?,
            }
        }
        LogFormat::Pretty => match config.timestamps {
            TimestampFormat::Local => registry
                .with(layer.with_timer(ChronoLocal::new(LOCAL_TIME_FORMAT.to_string())))
                .try_init()?,
            TimestampFormat::Utc => registry
                .with(layer.with_timer(ChronoUtc::new(UTC_TIME_FORMAT.to_string())))
                .try_init()?,
            TimestampFormat::None => registry.with(layer.without_time()).try_init()?,
        },
    }

    Ok(())
}
