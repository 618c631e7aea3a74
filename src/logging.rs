//! Structured logging configuration for rentchat.
//!
//! Uses `tracing` with `tracing-subscriber`. Output goes to stderr so it never
//! interleaves with the transcript printed on stdout.
//!
//! ## Environment Variables
//!
//! - `RENTCHAT_LOG` or `RUST_LOG`: log filter (e.g. `rentchat=debug`)
//! - `RENTCHAT_LOG_FORMAT`: output format (`pretty`, `compact`, `json`)
//!
//! Environment values win over the `[logging]` section of the config file.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "rentchat=warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable with colors and indentation
    Pretty,
    /// Compact single-line output
    #[default]
    Compact,
    /// JSON output for log aggregation
    Json,
}

impl LogFormat {
    /// Parse from string (case-insensitive); unknown values fall back to compact.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
    /// Include file/line in logs
    pub with_file: bool,
    /// Include target (module path)
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            with_file: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the environment, falling back to the config file section.
    pub fn resolve(file: &LoggingConfig) -> Self {
        let env_filter = std::env::var("RENTCHAT_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();
        let env_format = std::env::var("RENTCHAT_LOG_FORMAT").ok();
        Self::layered(env_filter, env_format, file)
    }

    fn layered(filter: Option<String>, format: Option<String>, file: &LoggingConfig) -> Self {
        let filter = filter
            .or_else(|| file.filter.clone())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = format
            .or_else(|| file.format.clone())
            .map(|s| LogFormat::parse(&s))
            .unwrap_or_default();

        Self {
            filter,
            format,
            ..Default::default()
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup; later calls are ignored.
pub fn init(config: LogConfig) {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_target(config.with_target);

    let _ = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.compact())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.pretty())
            .try_init(),
    };
}
