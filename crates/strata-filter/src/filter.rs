//! Core filter trait and continuation types.
//!
//! This module defines the [`Filter`] trait that every stage implements and
//! the [`Next`] continuation a filter calls to run the rest of the pipeline.
//!
//! # Onion execution
//!
//! ```text
//! before(A) → before(B) → before(C) → handler
//!                                        ↓
//! after(A)  ←  after(B) ←  after(C)  ←──┘
//! ```
//!
//! A filter that returns [`Flow::ShortCircuit`] from `before` produces the
//! result itself: nothing inward of it runs, and its own `after` is skipped.
//!
//! # Example
//!
//! ```
//! use strata_filter::{BoxFuture, Filter, Flow, InvocationContext};
//! use strata_core::StrataResult;
//!
//! struct RejectEmpty;
//!
//! impl Filter<String> for RejectEmpty {
//!     fn name(&self) -> &'static str {
//!         "reject_empty"
//!     }
//!
//!     fn before<'a>(
//!         &'a self,
//!         ctx: &'a mut InvocationContext,
//!     ) -> BoxFuture<'a, StrataResult<Flow<String>>> {
//!         Box::pin(async move {
//!             if ctx.arguments().is_empty() {
//!                 return Ok(Flow::ShortCircuit("no input".to_string()));
//!             }
//!             Ok(Flow::Continue)
//!         })
//!     }
//! }
//! ```

use crate::context::InvocationContext;
use crate::stage::FilterStage;
use std::future::Future;
use std::pin::Pin;
use strata_core::StrataResult;

/// Stage name that faults raised by the terminal handler are attributed to.
pub const HANDLER_STAGE: &str = "handler";

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Decision returned by a filter's `before` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow<R> {
    /// Run the rest of the pipeline.
    Continue,
    /// Stop here and use this value as the result.
    ShortCircuit(R),
}

impl<R> Flow<R> {
    /// Returns `true` for [`Flow::ShortCircuit`].
    pub const fn is_short_circuit(&self) -> bool {
        matches!(self, Self::ShortCircuit(_))
    }
}

/// The stage capability.
///
/// Implement `before` and/or `after` for the common case. Override
/// [`process`](Filter::process) to take full control of the call into the
/// rest of the chain, e.g. to observe faults raised further in.
///
/// # Invariants
///
/// - `process` calls `next.run()` at most once. Not calling it short-circuits.
/// - Filters are shared across concurrent invocations and must not keep
///   per-invocation state in `self`. Use the context for that.
/// - A filter must not assume its `after` runs: a fault raised further in
///   skips it.
pub trait Filter<R: Send + 'static>: Send + Sync + 'static {
    /// Returns the name of this filter, used in the journal and in logs.
    fn name(&self) -> &'static str;

    /// Runs before the rest of the pipeline.
    fn before<'a>(&'a self, _ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<Flow<R>>> {
        Box::pin(async { Ok(Flow::Continue) })
    }

    /// Runs after the rest of the pipeline produced `result`; may replace it.
    fn after<'a>(
        &'a self,
        _ctx: &'a mut InvocationContext,
        result: R,
    ) -> BoxFuture<'a, StrataResult<R>> {
        Box::pin(async move { Ok(result) })
    }

    /// Wraps the rest of the pipeline.
    ///
    /// The default composes `before`, `next.run` and `after`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StrataResult<R>> {
        Box::pin(async move {
            match self.before(ctx).await? {
                Flow::ShortCircuit(result) => {
                    next.skip(ctx);
                    Ok(result)
                }
                Flow::Continue => {
                    let result = next.run(ctx).await?;
                    self.after(ctx, result).await
                }
            }
        })
    }
}

/// The terminal operation a pipeline wraps.
pub trait Handler<R: Send + 'static>: Send + Sync + 'static {
    /// Runs the operation.
    fn call<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<R>>;
}

/// Continuation that runs the rest of the pipeline.
///
/// Consumed by [`run`](Next::run), so it can only be invoked once.
pub struct Next<'a, R: Send + 'static> {
    /// Position of the stage that owns this continuation.
    caller: Option<usize>,
    inner: NextInner<'a, R>,
}

enum NextInner<'a, R: Send + 'static> {
    /// More stages to run
    Chain {
        index: usize,
        stage: &'a FilterStage<R>,
        next: Box<Next<'a, R>>,
    },
    /// End of chain
    Handler(&'a dyn Handler<R>),
}

impl<'a, R: Send + 'static> Next<'a, R> {
    /// Creates a continuation that runs `stage` (at position `index`) and
    /// then `next`.
    pub(crate) fn new(index: usize, stage: &'a FilterStage<R>, mut next: Next<'a, R>) -> Self {
        next.caller = Some(index);
        Self {
            caller: None,
            inner: NextInner::Chain {
                index,
                stage,
                next: Box::new(next),
            },
        }
    }

    /// Creates the innermost continuation.
    pub(crate) fn handler(handler: &'a dyn Handler<R>) -> Self {
        Self {
            caller: None,
            inner: NextInner::Handler(handler),
        }
    }

    /// Runs the next stage, or the terminal handler if none remain.
    pub async fn run(self, ctx: &mut InvocationContext) -> StrataResult<R> {
        if let Some(caller) = self.caller {
            ctx.delegate_stage(caller);
        }

        match self.inner {
            NextInner::Chain { index, stage, next } => {
                let name = stage.name();
                ctx.enter_stage(index);
                tracing::trace!(
                    invocation_id = %ctx.invocation_id(),
                    stage = name,
                    "stage entered"
                );

                match stage.filter().process(ctx, *next).await {
                    Ok(result) => {
                        ctx.clear_fault();
                        if ctx.unwind_stage(index, name) {
                            tracing::debug!(
                                invocation_id = %ctx.invocation_id(),
                                stage = name,
                                "stage short-circuited"
                            );
                        }
                        Ok(result)
                    }
                    Err(err) => {
                        ctx.note_fault(name);
                        Err(err.with_stage(name))
                    }
                }
            }
            NextInner::Handler(handler) => match handler.call(ctx).await {
                Ok(result) => Ok(result),
                Err(err) => {
                    ctx.note_fault(HANDLER_STAGE);
                    Err(err.with_stage(HANDLER_STAGE))
                }
            },
        }
    }

    /// Declines to run the rest of the pipeline.
    ///
    /// Marks the owning stage `ShortCircuited` in the journal. A `process`
    /// that simply drops `next` is recorded the same way once it returns.
    pub fn skip(self, ctx: &mut InvocationContext) {
        if let Some(caller) = self.caller {
            ctx.short_circuit_stage(caller);
        }
    }
}

/// A filter assembled from plain `before` and `after` closures.
///
/// # Example
///
/// ```
/// use strata_filter::{Flow, HookFilter};
///
/// let filter: HookFilter<u32> = HookFilter::new("double")
///     .before(|_ctx| Ok(Flow::Continue))
///     .after(|_ctx, result| Ok(result * 2));
/// ```
pub struct HookFilter<R: Send + 'static> {
    name: &'static str,
    before: Option<Box<dyn Fn(&mut InvocationContext) -> StrataResult<Flow<R>> + Send + Sync>>,
    after: Option<Box<dyn Fn(&mut InvocationContext, R) -> StrataResult<R> + Send + Sync>>,
}

impl<R: Send + 'static> HookFilter<R> {
    /// Creates a filter that passes everything through.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            before: None,
            after: None,
        }
    }

    /// Sets the `before` hook.
    #[must_use]
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> StrataResult<Flow<R>> + Send + Sync + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    /// Sets the `after` hook.
    #[must_use]
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut InvocationContext, R) -> StrataResult<R> + Send + Sync + 'static,
    {
        self.after = Some(Box::new(hook));
        self
    }
}

impl<R: Send + 'static> Filter<R> for HookFilter<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn before<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<Flow<R>>> {
        let flow = self.before.as_ref().map_or(Ok(Flow::Continue), |hook| hook(ctx));
        Box::pin(async move { flow })
    }

    fn after<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        result: R,
    ) -> BoxFuture<'a, StrataResult<R>> {
        let result = match &self.after {
            Some(hook) => hook(ctx, result),
            None => Ok(result),
        };
        Box::pin(async move { result })
    }
}

/// A terminal handler built from a synchronous closure.
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Wraps `func`.
    pub fn new<R>(func: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> StrataResult<R> + Send + Sync + 'static,
        R: Send + 'static,
    {
        Self { func }
    }
}

impl<F, R> Handler<R> for FnHandler<F>
where
    F: Fn(&mut InvocationContext) -> StrataResult<R> + Send + Sync + 'static,
    R: Send + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<R>> {
        let result = (self.func)(ctx);
        Box::pin(async move { result })
    }
}

/// A terminal handler built from a closure returning a boxed future.
///
/// # Example
///
/// ```
/// use strata_filter::AsyncFnHandler;
///
/// let handler = AsyncFnHandler::new(|ctx| {
///     Box::pin(async move {
///         let id = *ctx.argument::<u64>(0)?;
///         Ok(format!("user-{id}"))
///     })
/// });
/// # let _ = handler;
/// ```
pub struct AsyncFnHandler<F> {
    func: F,
}

impl<F> AsyncFnHandler<F> {
    /// Wraps `func`.
    pub fn new<R>(func: F) -> Self
    where
        F: for<'c> Fn(&'c mut InvocationContext) -> BoxFuture<'c, StrataResult<R>>
            + Send
            + Sync
            + 'static,
        R: Send + 'static,
    {
        Self { func }
    }
}

impl<F, R> Handler<R> for AsyncFnHandler<F>
where
    F: for<'c> Fn(&'c mut InvocationContext) -> BoxFuture<'c, StrataResult<R>>
        + Send
        + Sync
        + 'static,
    R: Send + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<R>> {
        (self.func)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::StageState;
    use strata_core::StrataError;

    #[tokio::test]
    async fn test_next_handler() {
        let handler = FnHandler::new(|_ctx| Ok("handled"));
        let mut ctx = InvocationContext::new();

        let next: Next<'_, &str> = Next::handler(&handler);
        assert_eq!(next.run(&mut ctx).await.unwrap(), "handled");
    }

    #[tokio::test]
    async fn test_chain_wraps_handler() {
        let handler = FnHandler::new(|_ctx| Ok(10_u32));
        let stage: FilterStage<u32> =
            FilterStage::new(HookFilter::new("add_one").after(|_ctx, r: u32| Ok(r + 1)));
        let mut ctx = InvocationContext::new();
        ctx.begin("test", std::slice::from_ref(&stage));

        let next = Next::new(0, &stage, Next::handler(&handler));
        assert_eq!(next.run(&mut ctx).await.unwrap(), 11);
        assert!(ctx.short_circuited_by().is_none());
    }

    #[tokio::test]
    async fn test_short_circuit_records_stage() {
        let handler = FnHandler::new(|_ctx| Ok(0_u32));
        let stage: FilterStage<u32> =
            FilterStage::new(HookFilter::new("stop").before(|_ctx| Ok(Flow::ShortCircuit(7))));
        let mut ctx = InvocationContext::new();
        ctx.begin("test", std::slice::from_ref(&stage));

        let next = Next::new(0, &stage, Next::handler(&handler));
        assert_eq!(next.run(&mut ctx).await.unwrap(), 7);
        assert_eq!(ctx.short_circuited_by(), Some("stop"));
    }

    struct Peek;

    impl Filter<&'static str> for Peek {
        fn name(&self) -> &'static str {
            "peek"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut InvocationContext,
            next: Next<'a, &'static str>,
        ) -> BoxFuture<'a, StrataResult<&'static str>> {
            Box::pin(async move {
                next.skip(ctx);
                let state = ctx.journal().state_of("peek");
                Ok(if state == Some(StageState::ShortCircuited) {
                    "skipped"
                } else {
                    "unexpected"
                })
            })
        }
    }

    #[tokio::test]
    async fn test_skip_is_visible_until_unwound() {
        let handler = FnHandler::new(|_ctx| Ok("handled"));
        let stage: FilterStage<&'static str> = FilterStage::new(Peek);
        let mut ctx = InvocationContext::new();
        ctx.begin("test", std::slice::from_ref(&stage));

        let next = Next::new(0, &stage, Next::handler(&handler));
        assert_eq!(next.run(&mut ctx).await.unwrap(), "skipped");

        let record = ctx.journal().get("peek").unwrap();
        assert_eq!(record.state, StageState::Unwound);
        assert!(record.short_circuited);
        assert_eq!(ctx.short_circuited_by(), Some("peek"));
    }

    #[tokio::test]
    async fn test_argument_error_is_attributed_to_stage() {
        let handler = FnHandler::new(|_ctx| Ok(0_u64));
        let stage: FilterStage<u64> = FilterStage::new(HookFilter::new("gate").before(|ctx| {
            ctx.argument::<u64>(0)?;
            Ok(Flow::Continue)
        }));
        let mut ctx = InvocationContext::new();
        ctx.begin("test", std::slice::from_ref(&stage));

        let err = Next::new(0, &stage, Next::handler(&handler))
            .run(&mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.category(), strata_core::ErrorCategory::Argument);
        assert!(err.stage().is_none());
        assert_eq!(ctx.faulted_stage(), Some("gate"));
        assert_eq!(ctx.fault_stage(&err), Some("gate"));
    }

    #[tokio::test]
    async fn test_fault_is_attributed_to_stage() {
        let handler = FnHandler::new(|_ctx| Ok(()));
        let stage: FilterStage<()> = FilterStage::new(
            HookFilter::new("broken").before(|_ctx| Err(StrataError::fault("nope"))),
        );
        let mut ctx = InvocationContext::new();
        ctx.begin("test", std::slice::from_ref(&stage));

        let err = Next::new(0, &stage, Next::handler(&handler))
            .run(&mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some("broken"));
    }

    #[tokio::test]
    async fn test_async_handler_reads_arguments() {
        let handler = AsyncFnHandler::new(|ctx| {
            Box::pin(async move {
                let value = *ctx.argument::<u64>(0)?;
                Ok(value * 3)
            })
        });
        let mut ctx = InvocationContext::with_arguments(crate::Arguments::new().with(4_u64));

        assert_eq!(handler.call(&mut ctx).await.unwrap(), 12);
    }

    #[test]
    fn test_flow_helpers() {
        assert!(Flow::ShortCircuit(1).is_short_circuit());
        assert!(!Flow::<u8>::Continue.is_short_circuit());
    }
}
