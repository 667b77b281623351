//! # Strata
//!
//! **Ordered, short-circuitable filter pipelines**
//!
//! A pipeline wraps a terminal handler in a stack of filters. Each filter
//! sees the invocation on the way in and the result on the way out, and may
//! answer early instead of delegating inward.
//!
//! ```text
//! call → A.before → B.before → C.before → handler
//!                                            ↓
//! result ← A.after ← B.after ← C.after ←─────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! # let runtime = tokio::runtime::Runtime::new().unwrap();
//! # runtime.block_on(async {
//! let pipeline = Pipeline::named("double")
//!     .add_filter(HookFilter::new("audit"))
//!     .handler_fn(|ctx: &mut InvocationContext| Ok(ctx.argument::<i32>(0)? * 2))
//!     .build()
//!     .unwrap();
//!
//! let result = pipeline.call(Arguments::new().with(21_i32)).await.unwrap();
//! assert_eq!(result, 42);
//! # });
//! ```
//!
//! ## Crates
//!
//! - [`core`]: error types and invocation ids
//! - [`filter`]: filters, stages, pipelines and the registry
//! - [`telemetry`]: structured logging and Prometheus metrics
//! - [`config`]: layered TOML/JSON/env configuration

#![doc(html_root_url = "https://docs.rs/strata/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use strata_core as core;

// Re-export the pipeline engine
pub use strata_filter as filter;

// Re-export telemetry
pub use strata_telemetry as telemetry;

// Re-export configuration
pub use strata_config as config;

/// Prelude module for convenient imports.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    pub use strata_core::{ErrorCategory, ErrorEnvelope, InvocationId, StrataError, StrataResult};

    pub use strata_filter::{
        Arguments, BoxFuture, Endpoint, Filter, FilterGroup, FilterRegistry, FilterStage, Flow,
        Handler, HookFilter, InvocationContext, Next, Pipeline, PipelineBuilder, PipelineOptions,
        PipelineStatus, Scope, StageState,
    };

    // Built-in filters
    pub use strata_filter::{ArgumentGuard, CancellationFilter, FaultBoundary, TimingFilter};

    pub use strata_config::{ConfigLoader, StrataConfig};
    pub use strata_telemetry::{init_telemetry, TelemetryConfig};
}
