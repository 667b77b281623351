//! Configuration schema types.
//!
//! This module defines the structure of every configuration section and how
//! each one converts into the runtime type it configures.

use serde::{Deserialize, Serialize};
use strata_filter::PipelineOptions;
use strata_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

pub use strata_telemetry::LogFormat;

/// Pipeline configuration section.
///
/// Converts into [`PipelineOptions`], which a pipeline builder or registry
/// applies at build time.
///
/// # Example
///
/// ```
/// use strata_config::PipelineConfig;
/// use strata_filter::PipelineOptions;
///
/// let config = PipelineConfig {
///     max_stages: Some(16),
///     reject_duplicate_names: true,
///     record_metrics: false,
/// };
///
/// let options = PipelineOptions::from(&config);
/// assert_eq!(options.max_stages, Some(16));
/// assert!(options.reject_duplicate_names);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum number of stages per pipeline. None means unlimited.
    #[serde(default)]
    pub max_stages: Option<usize>,

    /// Fail the build when two stages share a filter name.
    #[serde(default)]
    pub reject_duplicate_names: bool,

    /// Record `strata_*` metrics for each invocation.
    #[serde(default = "default_true")]
    pub record_metrics: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_stages: None,
            reject_duplicate_names: false,
            record_metrics: default_true(),
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_stages: config.max_stages,
            reject_duplicate_names: config.reject_duplicate_names,
            record_metrics: config.record_metrics,
        }
    }
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name attached to log output.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deployment environment (development, staging, production).
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfigSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            environment: default_environment(),
            metrics: MetricsConfigSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl From<&TelemetryConfigSection> for TelemetryConfig {
    fn from(section: &TelemetryConfigSection) -> Self {
        Self {
            service_name: section.service_name.clone(),
            environment: section.environment.clone(),
            metrics: MetricsConfig {
                enabled: section.metrics.enabled,
                duration_buckets: section.metrics.duration_buckets.clone(),
            },
            logging: LogConfig {
                enabled: section.logging.enabled,
                level: section.logging.level.clone(),
                format: section.logging.format,
                span_events: section.logging.span_events,
                include_location: section.logging.include_location,
                thread_ids: section.logging.thread_ids,
                include_target: section.logging.include_target,
                service_name: section.service_name.clone(),
            },
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfigSection {
    /// Install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Invocation duration histogram buckets, in seconds.
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfigSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            duration_buckets: default_duration_buckets(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or `EnvFilter` directive (e.g. "info", "strata_filter=trace").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line numbers.
    #[serde(default)]
    pub include_location: bool,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include the event target.
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
            thread_ids: false,
            include_target: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "strata".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_duration_buckets() -> Vec<f64> {
    MetricsConfig::default().duration_buckets
}
