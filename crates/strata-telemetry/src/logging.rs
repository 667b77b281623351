//! Structured logging for Strata.
//!
//! The executor emits `tracing` events; this module installs a
//! `tracing-subscriber` registry that renders them.
//!
//! | Level | Event |
//! |-------|-------|
//! | `trace` | stage entered |
//! | `debug` | stage short-circuited, invocation completed |
//! | `warn` | invocation faulted |
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(pipeline = "orders", "pipeline ready");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line, human-readable output.
    Pretty,
    /// Single-line, human-readable output.
    Compact,
}

impl LogFormat {
    /// Parses a format name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Subscriber settings consumed by [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `false` makes [`init_logging`] a no-op.
    pub enabled: bool,

    /// `EnvFilter` directives, e.g. `info` or `strata_filter=trace,info`.
    pub level: String,

    /// Rendering of each event.
    pub format: LogFormat,

    /// Emit an event when a span opens and closes.
    pub span_events: bool,

    /// Record source file and line on each event.
    pub include_location: bool,

    /// Record the emitting thread id.
    pub thread_ids: bool,

    /// Record the module path the event came from.
    pub include_target: bool,

    /// Owning service. [`TelemetryConfig`](crate::TelemetryConfig) keeps this in sync.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Pretty `debug` output with span events and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".into(),
            format: LogFormat::Pretty,
            span_events: true,
            include_location: true,
            ..Self::production()
        }
    }

    /// JSON at `info`. This is also the default.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".into(),
            format: LogFormat::Json,
            span_events: false,
            include_location: false,
            thread_ids: false,
            include_target: true,
            service_name: "strata".into(),
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// Only the first successful call in a process takes effect.
///
/// # Errors
///
/// [`TelemetryError::LoggingInit`] when `config.level` does not parse or a
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let directives = create_env_filter(&config.level)?;
    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(config.fmt_span())
        .with_target(config.include_target)
        .with_thread_ids(config.thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let layer = match config.format {
        LogFormat::Json => layer.json().with_filter(directives).boxed(),
        LogFormat::Pretty => layer.pretty().with_filter(directives).boxed(),
        LogFormat::Compact => layer.compact().with_filter(directives).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|err| TelemetryError::LoggingInit(err.to_string()))
}

/// Parses `directives` into an [`EnvFilter`].
///
/// # Errors
///
/// [`TelemetryError::LoggingInit`] naming the offending directive.
pub fn create_env_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|err| TelemetryError::LoggingInit(format!("bad filter `{directives}`: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(!config.include_location);
        assert_eq!(config.fmt_span(), FmtSpan::NONE);
    }

    #[test]
    fn test_development_preset() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "debug");
        assert!(config.include_location);
        assert_eq!(config.fmt_span(), FmtSpan::NEW | FmtSpan::CLOSE);
        assert!(config.include_target);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("Pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_env_filter_directives() {
        assert!(create_env_filter("info,strata_filter=trace").is_ok());
        let err = create_env_filter("strata=verbose").unwrap_err();
        assert!(err.to_string().contains("strata=verbose"));
    }

    #[test]
    fn test_disabled_is_noop() {
        let config = LogConfig {
            enabled: false,
            level: "strata=verbose".into(),
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
