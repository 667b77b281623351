//! Cooperative cancellation.

use crate::context::InvocationContext;
use crate::filter::{BoxFuture, Filter, Flow};
use strata_core::{StrataError, StrataResult};

type Produce<R> = Box<dyn Fn(&mut InvocationContext) -> StrataResult<R> + Send + Sync>;

/// Stops the pipeline once the context's cancellation flag is set.
///
/// The flag is checked when the stage is entered; stages registered inward
/// of this one never run for a cancelled invocation.
pub struct CancellationFilter<R: Send + 'static> {
    produce: Produce<R>,
}

impl<R: Send + 'static> CancellationFilter<R> {
    /// Short-circuits with the value `produce` returns.
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> StrataResult<R> + Send + Sync + 'static,
    {
        Self {
            produce: Box::new(produce),
        }
    }

    /// Fails with [`StrataError::Cancelled`] instead of producing a result.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(|_ctx| Err(StrataError::Cancelled))
    }
}

impl<R: Send + 'static> Filter<R> for CancellationFilter<R> {
    fn name(&self) -> &'static str {
        "cancellation"
    }

    fn before<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<Flow<R>>> {
        let flow = if ctx.is_cancelled() {
            tracing::debug!(invocation_id = %ctx.invocation_id(), "invocation cancelled");
            (self.produce)(ctx).map(Flow::ShortCircuit)
        } else {
            Ok(Flow::Continue)
        };
        Box::pin(async move { flow })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancellationFlag;
    use crate::filter::HookFilter;
    use crate::pipeline::Pipeline;
    use crate::stage::FilterStage;
    use strata_core::ErrorCategory;

    fn pipeline(filter: CancellationFilter<&'static str>) -> Pipeline<&'static str> {
        Pipeline::builder()
            .stage(FilterStage::new(filter).with_priority(-1))
            .add_filter(HookFilter::new("work"))
            .handler_fn(|_ctx| Ok("done"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_runs_normally_when_not_cancelled() {
        let pipeline = pipeline(CancellationFilter::new(|_ctx| Ok("cancelled")));
        let mut ctx = InvocationContext::new();
        assert_eq!(pipeline.invoke(&mut ctx).await.unwrap(), "done");
        assert!(ctx.short_circuited_by().is_none());
    }

    #[tokio::test]
    async fn test_short_circuits_when_cancelled() {
        let pipeline = pipeline(CancellationFilter::new(|_ctx| Ok("cancelled")));
        let flag = CancellationFlag::new();
        let mut ctx = InvocationContext::new().with_cancellation(flag.clone());

        flag.cancel();
        assert_eq!(pipeline.invoke(&mut ctx).await.unwrap(), "cancelled");
        assert_eq!(ctx.short_circuited_by(), Some("cancellation"));
        assert_eq!(ctx.journal().entered(), vec!["cancellation"]);
    }

    #[tokio::test]
    async fn test_failing_variant() {
        let pipeline = pipeline(CancellationFilter::failing());
        let flag = CancellationFlag::new();
        flag.cancel();
        let mut ctx = InvocationContext::new().with_cancellation(flag);

        let err = pipeline.invoke(&mut ctx).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Cancelled);
    }
}
