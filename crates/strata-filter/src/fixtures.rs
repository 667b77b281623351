//! Test fixtures for pipelines.
//!
//! A [`TraceLog`] collects one entry per hook call, so a test can assert the
//! exact onion order of an invocation.
//!
//! # Example
//!
//! ```
//! use strata_filter::fixtures::{recording_filter, recording_handler, TraceLog};
//! use strata_filter::{Arguments, Pipeline};
//!
//! # tokio_test::block_on(async {
//! let log = TraceLog::new();
//! let pipeline = Pipeline::builder()
//!     .add_filter(recording_filter("A", &log))
//!     .add_filter(recording_filter("B", &log))
//!     .handler(recording_handler(&log, 0_u8))
//!     .build()
//!     .unwrap();
//!
//! pipeline.call(Arguments::new()).await.unwrap();
//! assert_eq!(log.entries(), ["before(A)", "before(B)", "H", "after(B)", "after(A)"]);
//! # });
//! ```

use crate::context::InvocationContext;
use crate::filter::{Flow, FnHandler, Handler, HookFilter};
use parking_lot::Mutex;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult};

/// Entry recorded by [`recording_handler`].
pub const HANDLER_ENTRY: &str = "H";

/// Shared, ordered log of hook calls.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TraceLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a copy of all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// A filter that records `before(name)` and `after(name)`.
#[must_use]
pub fn recording_filter<R: Send + 'static>(name: &'static str, log: &TraceLog) -> HookFilter<R> {
    let before_log = log.clone();
    let after_log = log.clone();
    HookFilter::new(name)
        .before(move |_ctx| {
            before_log.push(format!("before({name})"));
            Ok(Flow::Continue)
        })
        .after(move |_ctx, result| {
            after_log.push(format!("after({name})"));
            Ok(result)
        })
}

/// A filter that records `before(name)` and then short-circuits with
/// `result`. Its `after` would record `after(name)`, which must never show
/// up.
#[must_use]
pub fn short_circuiting_filter<R>(name: &'static str, log: &TraceLog, result: R) -> HookFilter<R>
where
    R: Clone + Send + Sync + 'static,
{
    let before_log = log.clone();
    let after_log = log.clone();
    HookFilter::new(name)
        .before(move |_ctx| {
            before_log.push(format!("before({name})"));
            Ok(Flow::ShortCircuit(result.clone()))
        })
        .after(move |_ctx, result| {
            after_log.push(format!("after({name})"));
            Ok(result)
        })
}

/// A filter that records `before(name)` and then fails.
#[must_use]
pub fn failing_filter<R: Send + 'static>(name: &'static str, log: &TraceLog) -> HookFilter<R> {
    let before_log = log.clone();
    let after_log = log.clone();
    HookFilter::new(name)
        .before(move |_ctx| {
            before_log.push(format!("before({name})"));
            Err(StrataError::fault(format!("{name} failed")))
        })
        .after(move |_ctx, result| {
            after_log.push(format!("after({name})"));
            Ok(result)
        })
}

/// A terminal handler that records [`HANDLER_ENTRY`] and returns `result`.
pub fn recording_handler<R>(log: &TraceLog, result: R) -> impl Handler<R>
where
    R: Clone + Send + Sync + 'static,
{
    let log = log.clone();
    FnHandler::new(move |_ctx: &mut InvocationContext| -> StrataResult<R> {
        log.push(HANDLER_ENTRY);
        Ok(result.clone())
    })
}
