//! Observability for Strata pipelines.
//!
//! - **Logging**: `tracing-subscriber` output (JSON, pretty or compact) for
//!   the events the executor emits
//! - **Metrics**: invocation, short-circuit and fault counters via the
//!   `metrics` crate, rendered by a Prometheus recorder
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `strata_invocations_total` | Counter | `pipeline`, `outcome` |
//! | `strata_short_circuits_total` | Counter | `pipeline`, `stage` |
//! | `strata_faults_total` | Counter | `pipeline`, `stage` |
//! | `strata_invocation_duration_seconds` | Histogram | `pipeline` |
//! | `strata_in_flight_invocations` | Gauge | `pipeline` |
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("billing")
//!     .log_level("info,strata_filter=debug")
//!     .build();
//!
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig, Outcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    tracing::debug!(
        service = %config.service_name,
        environment = %config.environment,
        "telemetry initialized"
    );

    Ok(())
}
