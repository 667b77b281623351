//! # Strata Filter
//!
//! Ordered, short-circuitable filter pipeline.
//!
//! A [`Pipeline`] wraps a terminal [`Handler`] in a chain of [`Filter`]
//! stages. Each stage runs its `before` hook on the way in and its `after`
//! hook on the way out:
//!
//! ```text
//! Call → before(A) → before(B) → before(C) → Handler
//!                                               ↓
//! Result ← after(A) ← after(B) ← after(C) ←────┘
//! ```
//!
//! ## Ordering
//!
//! | Key | Rule |
//! |-----|------|
//! | `priority` | Lower runs earlier (outer) |
//! | [`Scope`] | On equal priority: global, then group, then item |
//! | registration | On equal priority and scope: first registered runs first |
//!
//! ## Short-circuit and faults
//!
//! - A `before` hook returning [`Flow::ShortCircuit`] produces the result.
//!   Nothing inward runs, its own `after` is skipped, and only the stages
//!   outward of it unwind.
//! - An error from any hook or the handler propagates immediately, skipping
//!   every `after` not yet run. A [`FaultBoundary`] placed outermost can
//!   turn it back into a result.
//!
//! ## Example
//!
//! ```
//! use strata_filter::{Arguments, Flow, HookFilter, Pipeline};
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::named("greet")
//!     .add_filter(HookFilter::new("require_name").before(|ctx| {
//!         if ctx.arguments().is_empty() {
//!             return Ok(Flow::ShortCircuit("who are you?".to_string()));
//!         }
//!         Ok(Flow::Continue)
//!     }))
//!     .handler_fn(|ctx| Ok(format!("hello {}", ctx.argument::<&str>(0)?)))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(pipeline.call(Arguments::new().with("ada")).await.unwrap(), "hello ada");
//! assert_eq!(pipeline.call(Arguments::new()).await.unwrap(), "who are you?");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/strata-filter/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod arguments;
pub mod context;
pub mod filter;
pub mod filters;
pub mod fixtures;
pub mod journal;
pub mod pipeline;
pub mod registry;
pub mod stage;

// Re-export main types at crate root
pub use arguments::Arguments;
pub use context::{CancellationFlag, InvocationContext};
pub use filter::{
    AsyncFnHandler, BoxFuture, Filter, Flow, FnHandler, Handler, HookFilter, Next, HANDLER_STAGE,
};
pub use filters::{
    ArgumentGuard, ArgumentRejection, CancellationFilter, FaultBoundary, ObservedFault,
    StageTimings, TimingFilter,
};
pub use journal::{Journal, PipelineStatus, StageRecord, StageState};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineOptions, DEFAULT_PIPELINE_NAME};
pub use registry::{Endpoint, FilterGroup, FilterRegistry};
pub use stage::{order_stages, FilterStage, Scope};
