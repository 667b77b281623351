//! Prometheus metrics for Strata.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `strata_invocations_total` | Counter | `pipeline`, `outcome` | Finished invocations |
//! | `strata_short_circuits_total` | Counter | `pipeline`, `stage` | Stages that stopped a pipeline |
//! | `strata_faults_total` | Counter | `pipeline`, `stage` | Faults that reached the caller |
//! | `strata_invocation_duration_seconds` | Histogram | `pipeline` | Invocation latency |
//! | `strata_in_flight_invocations` | Gauge | `pipeline` | Invocations currently running |
//!
//! The recording functions are no-ops until a recorder is installed, either
//! through [`init_metrics`] or by the embedding application.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Invocation counter.
pub const INVOCATIONS_TOTAL: &str = "strata_invocations_total";
/// Short-circuit counter.
pub const SHORT_CIRCUITS_TOTAL: &str = "strata_short_circuits_total";
/// Fault counter.
pub const FAULTS_TOTAL: &str = "strata_faults_total";
/// Invocation duration histogram.
pub const INVOCATION_DURATION_SECONDS: &str = "strata_invocation_duration_seconds";
/// In-flight gauge.
pub const IN_FLIGHT_INVOCATIONS: &str = "strata_in_flight_invocations";

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for invocation duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 100µs to 10s
            duration_buckets: vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
                10.0,
            ],
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The terminal handler produced the result.
    Completed,
    /// A stage produced the result without calling inward.
    ShortCircuited,
    /// An error reached the caller.
    Faulted,
}

impl Outcome {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ShortCircuited => "short_circuited",
            Self::Faulted => "faulted",
        }
    }
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for empty buckets and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.duration_buckets.is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "duration_buckets must not be empty".to_string(),
        ));
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    describe_metrics();

    Ok(())
}

/// Returns the global metrics handle if initialized.
pub fn metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if [`init_metrics`] has not run.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for all standard metrics.
pub fn describe_metrics() {
    describe_counter!(INVOCATIONS_TOTAL, "Total number of finished pipeline invocations");
    describe_counter!(
        SHORT_CIRCUITS_TOTAL,
        "Total number of invocations stopped early by a stage"
    );
    describe_counter!(FAULTS_TOTAL, "Total number of faults that reached the caller");
    describe_histogram!(
        INVOCATION_DURATION_SECONDS,
        "Pipeline invocation duration in seconds"
    );
    describe_gauge!(
        IN_FLIGHT_INVOCATIONS,
        "Number of pipeline invocations currently running"
    );
}

/// Records a finished invocation.
///
/// Updates `strata_invocations_total` and
/// `strata_invocation_duration_seconds`.
pub fn record_invocation(pipeline: &str, outcome: Outcome, duration: Duration) {
    counter!(
        INVOCATIONS_TOTAL,
        "pipeline" => pipeline.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        INVOCATION_DURATION_SECONDS,
        "pipeline" => pipeline.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records the stage that short-circuited an invocation.
pub fn record_short_circuit(pipeline: &str, stage: &str) {
    counter!(
        SHORT_CIRCUITS_TOTAL,
        "pipeline" => pipeline.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Records a fault that reached the caller.
///
/// Faults without attribution are labelled `unknown`.
pub fn record_fault(pipeline: &str, stage: Option<&str>) {
    counter!(
        FAULTS_TOTAL,
        "pipeline" => pipeline.to_string(),
        "stage" => stage.unwrap_or("unknown").to_string()
    )
    .increment(1);
}

/// Guard that tracks one in-flight invocation.
///
/// The gauge is decremented on drop, so an invocation whose future is
/// dropped mid-flight is still accounted for.
#[derive(Debug)]
pub struct InFlightGuard {
    pipeline: String,
}

impl InFlightGuard {
    /// Increments the in-flight gauge for `pipeline`.
    #[must_use]
    pub fn new(pipeline: &str) -> Self {
        gauge!(IN_FLIGHT_INVOCATIONS, "pipeline" => pipeline.to_string()).increment(1.0);
        Self {
            pipeline: pipeline.to_string(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_INVOCATIONS, "pipeline" => self.pipeline.clone()).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_with_local_recorder(f: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    fn metric_line<'a>(output: &'a str, name: &str) -> &'a str {
        output
            .lines()
            .find(|line| line.starts_with(&format!("{name}{{")))
            .unwrap_or_default()
    }

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Completed.as_str(), "completed");
        assert_eq!(Outcome::ShortCircuited.as_str(), "short_circuited");
        assert_eq!(Outcome::Faulted.as_str(), "faulted");
    }

    #[test]
    fn test_record_invocation() {
        let output = render_with_local_recorder(|| {
            record_invocation("orders", Outcome::Completed, Duration::from_millis(3));
            record_invocation("orders", Outcome::Completed, Duration::from_millis(4));
        });
        let line = metric_line(&output, INVOCATIONS_TOTAL);
        assert!(line.contains(r#"pipeline="orders""#));
        assert!(line.contains(r#"outcome="completed""#));
        assert!(line.ends_with(" 2"));
        assert!(output.contains(INVOCATION_DURATION_SECONDS));
    }

    #[test]
    fn test_record_short_circuit_and_fault() {
        let output = render_with_local_recorder(|| {
            record_short_circuit("orders", "auth");
            record_fault("orders", None);
        });
        let line = metric_line(&output, SHORT_CIRCUITS_TOTAL);
        assert!(line.contains(r#"stage="auth""#));
        assert!(line.ends_with(" 1"));

        let line = metric_line(&output, FAULTS_TOTAL);
        assert!(line.contains(r#"stage="unknown""#));
        assert!(line.ends_with(" 1"));
    }

    #[test]
    fn test_in_flight_guard() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let (during, after) = metrics::with_local_recorder(&recorder, || {
            let guard = InFlightGuard::new("orders");
            let during = handle.render();
            drop(guard);
            (during, handle.render())
        });

        let during = metric_line(&during, IN_FLIGHT_INVOCATIONS);
        assert!(during.contains(r#"pipeline="orders""#));
        assert!(!during.ends_with(" 0"));
        assert!(metric_line(&after, IN_FLIGHT_INVOCATIONS).ends_with(" 0"));
    }

    #[test]
    fn test_disabled_metrics_skip_install() {
        let config = MetricsConfig {
            enabled: false,
            duration_buckets: Vec::new(),
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let config = MetricsConfig {
            enabled: true,
            duration_buckets: Vec::new(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_invocation("noop", Outcome::Faulted, Duration::ZERO);
        record_short_circuit("noop", "stage");
        record_fault("noop", Some("stage"));
    }
}
