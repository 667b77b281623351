//! Failures raised while installing the logging or metrics backends.

use thiserror::Error;

/// Error returned by [`init_telemetry`](crate::init_telemetry) and its parts.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The Prometheus recorder could not be installed.
    #[error("metrics setup failed: {0}")]
    MetricsInit(String),

    /// The `tracing` subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    LoggingInit(String),

    /// A setting was rejected before anything was installed.
    #[error("invalid telemetry setting: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subsystem() {
        let err = TelemetryError::MetricsInit("recorder already installed".into());
        assert_eq!(err.to_string(), "metrics setup failed: recorder already installed");

        let err = TelemetryError::LoggingInit("bad directive".into());
        assert!(err.to_string().starts_with("logging setup failed"));

        let err = TelemetryError::InvalidConfig("empty buckets".into());
        assert!(err.to_string().contains("empty buckets"));
    }
}
