//! Settings shared by the logging and metrics subsystems.

use crate::logging::{LogConfig, LogFormat};
use crate::metrics::MetricsConfig;

const DEFAULT_SERVICE: &str = "strata";
const DEFAULT_ENVIRONMENT: &str = "development";

/// Everything [`init_telemetry`](crate::init_telemetry) needs to set up a process.
///
/// `service_name` is copied into [`LogConfig::service_name`] by the builder so
/// that every log line names the owning service.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name stamped on log output.
    pub service_name: String,

    /// Deployment label such as `staging`.
    pub environment: String,

    /// Prometheus recorder settings.
    pub metrics: MetricsConfig,

    /// Subscriber settings.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Starts from the defaults and lets callers override individual fields.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE.to_owned(),
            environment: DEFAULT_ENVIRONMENT.to_owned(),
            metrics: MetricsConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Fluent construction of a [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    inner: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Same as [`TelemetryConfig::builder`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name, also applied to the log config.
    #[must_use]
    pub fn service_name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.inner.service_name);
        self
    }

    /// Sets the deployment label.
    #[must_use]
    pub fn environment(mut self, environment: &str) -> Self {
        environment.clone_into(&mut self.inner.environment);
        self
    }

    /// Replaces the metrics section wholesale.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.inner.metrics = metrics;
        self
    }

    /// Replaces the logging section wholesale. The service name set on this
    /// builder still wins at [`build`](Self::build).
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.inner.logging = logging;
        self
    }

    /// `EnvFilter` directives, e.g. `strata_filter=trace,info`.
    #[must_use]
    pub fn log_level(mut self, level: &str) -> Self {
        level.clone_into(&mut self.inner.logging.level);
        self
    }

    /// Sets the log output format.
    #[must_use]
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.inner.logging.format = format;
        self
    }

    /// Turns the Prometheus recorder on or off without touching its buckets.
    #[must_use]
    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.inner.metrics.enabled = enabled;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let mut config = self.inner;
        config.logging.service_name.clone_from(&config.service_name);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "strata");
        assert_eq!(config.logging.service_name, "strata");
        assert_eq!(config.environment, "development");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_builder_overrides() {
        let config = TelemetryConfig::builder()
            .service_name("billing")
            .environment("production")
            .build();

        assert_eq!(config.service_name, "billing");
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_service_name_reaches_log_config() {
        let config = TelemetryConfig::builder()
            .service_name("billing")
            .logging(LogConfig::production())
            .build();
        assert_eq!(config.logging.service_name, "billing");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_log_shortcuts() {
        let config = TelemetryConfig::builder()
            .log_level("strata_filter=trace")
            .log_format(LogFormat::Compact)
            .build();

        assert_eq!(config.logging.level, "strata_filter=trace");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_metrics_toggle_keeps_buckets() {
        let config = TelemetryConfig::builder().metrics_enabled(false).build();
        assert!(!config.metrics.enabled);
        assert_eq!(
            config.metrics.duration_buckets,
            MetricsConfig::default().duration_buckets
        );
    }
}
