//! Main configuration types.
//!
//! This module provides the top-level [`StrataConfig`] struct and its builder.

use serde::{Deserialize, Serialize};
use strata_filter::PipelineOptions;
use strata_telemetry::TelemetryConfig;

use crate::{ConfigError, LogFormat, PipelineConfig, TelemetryConfigSection};

/// Complete Strata configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use strata_config::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.pipeline.max_stages, None);
/// assert_eq!(config.telemetry.service_name, "strata");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Pipeline build options.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Telemetry configuration (metrics, logging).
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl StrataConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> StrataConfigBuilder {
        StrataConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `pipeline.max_stages` is zero
    /// - `telemetry.service_name` is empty
    /// - `telemetry.logging.level` is not a valid filter directive
    /// - metrics are enabled and the duration buckets are empty, negative or unsorted
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.max_stages == Some(0) {
            return Err(ConfigError::invalid_value(
                "pipeline.max_stages",
                "must be at least 1",
            ));
        }

        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if self.telemetry.logging.enabled {
            strata_telemetry::logging::create_env_filter(&self.telemetry.logging.level)
                .map_err(|e| ConfigError::invalid_value("telemetry.logging.level", e.to_string()))?;
        }

        if self.telemetry.metrics.enabled {
            let buckets = &self.telemetry.metrics.duration_buckets;
            if buckets.is_empty() {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.duration_buckets",
                    "must not be empty",
                ));
            }
            if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.duration_buckets",
                    "must be positive",
                ));
            }
            if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.duration_buckets",
                    "must be strictly increasing",
                ));
            }
        }

        Ok(())
    }

    /// Options for pipelines built under this configuration.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions::from(&self.pipeline)
    }

    /// Telemetry settings for [`strata_telemetry::init_telemetry`].
    #[must_use]
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::from(&self.telemetry)
    }

    /// Create a development configuration preset.
    ///
    /// Pretty debug logs with source locations. Duplicate stage names fail
    /// the build.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_config::StrataConfig;
    ///
    /// let config = StrataConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.logging.span_events = true;
        config.telemetry.environment = "development".to_string();

        config.pipeline.reject_duplicate_names = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_config::{LogFormat, StrataConfig};
    ///
    /// let config = StrataConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.environment = "production".to_string();

        config
    }
}

/// Builder for [`StrataConfig`].
#[derive(Debug, Default)]
pub struct StrataConfigBuilder {
    pipeline: Option<PipelineConfig>,
    telemetry: Option<TelemetryConfigSection>,
}

impl StrataConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> StrataConfig {
        StrataConfig {
            pipeline: self.pipeline.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<StrataConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoggingConfig, MetricsConfigSection};

    #[test]
    fn test_default_config() {
        let config = StrataConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.pipeline.record_metrics);
        assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_builder_sections() {
        let config = StrataConfig::builder()
            .pipeline(PipelineConfig {
                max_stages: Some(3),
                ..Default::default()
            })
            .build();

        assert_eq!(config.pipeline.max_stages, Some(3));
        assert_eq!(config.telemetry.service_name, "strata");
        assert_eq!(config.pipeline_options().max_stages, Some(3));
    }

    #[test]
    fn test_build_validated_rejects_zero_stages() {
        let result = StrataConfig::builder()
            .pipeline(PipelineConfig {
                max_stages: Some(0),
                ..Default::default()
            })
            .build_validated();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "pipeline.max_stages"
        ));
    }

    #[test]
    fn test_validate_service_name() {
        let mut config = StrataConfig::default();
        config.telemetry.service_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = StrataConfig::default();
        config.telemetry.logging.level = "strata_filter=trace,info".to_string();
        assert!(config.validate().is_ok());

        config.telemetry.logging.level = "strata=verbose".to_string();
        assert!(config.validate().is_err());

        config.telemetry.logging = LoggingConfig {
            enabled: false,
            level: "strata=verbose".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_buckets() {
        let mut config = StrataConfig::default();

        config.telemetry.metrics.duration_buckets = vec![];
        assert!(config.validate().is_err());

        config.telemetry.metrics.duration_buckets = vec![0.5, 0.1];
        assert!(config.validate().is_err());

        config.telemetry.metrics.duration_buckets = vec![-1.0, 0.1];
        assert!(config.validate().is_err());

        config.telemetry.metrics = MetricsConfigSection {
            enabled: false,
            duration_buckets: vec![],
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = StrataConfig::development();
        assert_eq!(dev.telemetry.logging.format, LogFormat::Pretty);
        assert!(dev.pipeline.reject_duplicate_names);
        assert!(dev.validate().is_ok());

        let prod = StrataConfig::production();
        assert_eq!(prod.telemetry.environment, "production");
        assert!(!prod.pipeline.reject_duplicate_names);
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_telemetry_config() {
        let config = StrataConfig::development().telemetry_config();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.include_location);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = StrataConfig::development();
        let text = toml::to_string(&config).unwrap();
        let parsed: StrataConfig = toml::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }
}
