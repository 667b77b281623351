//! Outermost fault observer.

use crate::context::InvocationContext;
use crate::filter::{BoxFuture, Filter, Next};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use strata_core::{ErrorCategory, StrataError, StrataResult};

type Convert<R> = Box<dyn Fn(&mut InvocationContext, StrataError) -> StrataResult<R> + Send + Sync>;

/// Details of the fault a [`FaultBoundary`] converted, stored as a context
/// extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedFault {
    /// Stage the fault was attributed to.
    pub stage: Option<String>,
    /// Error category.
    pub category: ErrorCategory,
    /// Rendered error message.
    pub message: String,
    /// Whether the fault was a caught panic.
    pub panicked: bool,
}

/// Turns errors raised further in into a result.
///
/// Register it with the lowest priority so it wraps every other stage. The
/// conversion closure receives the error and may still return one, which
/// then propagates outward.
///
/// Panics are not caught unless [`catch_panics`](Self::catch_panics) is set.
///
/// # Example
///
/// ```
/// use strata_filter::{Arguments, FaultBoundary, FilterStage, Pipeline};
/// use strata_core::StrataError;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder()
///     .stage(
///         FilterStage::new(FaultBoundary::new(|_ctx, err| Ok(format!("fallback: {err}"))))
///             .with_priority(i32::MIN),
///     )
///     .handler_fn(|_ctx| Err(StrataError::fault("down")))
///     .build()
///     .unwrap();
///
/// let result = pipeline.call(Arguments::new()).await.unwrap();
/// assert_eq!(result, "fallback: Unhandled fault: down");
/// # });
/// ```
pub struct FaultBoundary<R: Send + 'static> {
    catch_panics: bool,
    convert: Convert<R>,
}

impl<R: Send + 'static> FaultBoundary<R> {
    /// Creates a boundary that converts errors with `convert`.
    pub fn new<F>(convert: F) -> Self
    where
        F: Fn(&mut InvocationContext, StrataError) -> StrataResult<R> + Send + Sync + 'static,
    {
        Self {
            catch_panics: false,
            convert: Box::new(convert),
        }
    }

    /// Also converts panics raised further in, as faults.
    #[must_use]
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }
}

impl<R: Send + 'static> Filter<R> for FaultBoundary<R> {
    fn name(&self) -> &'static str {
        "fault_boundary"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StrataResult<R>> {
        Box::pin(async move {
            let (outcome, panicked) = if self.catch_panics {
                match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
                    Ok(outcome) => (outcome, false),
                    Err(payload) => (Err(StrataError::fault(panic_message(&*payload))), true),
                }
            } else {
                (next.run(ctx).await, false)
            };

            let err = match outcome {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            let stage = ctx.fault_stage(&err).map(str::to_string);
            tracing::warn!(
                invocation_id = %ctx.invocation_id(),
                stage = stage.as_deref(),
                panicked,
                error = %err,
                "fault converted"
            );
            ctx.set_extension(ObservedFault {
                stage,
                category: err.category(),
                message: err.to_string(),
                panicked,
            });

            (self.convert)(ctx, err)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}
