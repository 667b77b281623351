//! Positional argument validation.

use crate::arguments::Arguments;
use crate::context::InvocationContext;
use crate::filter::{BoxFuture, Filter, Flow};
use strata_core::StrataResult;

type Check = Box<dyn Fn(&Arguments) -> Result<(), String> + Send + Sync>;
type Reject<R> = Box<dyn Fn(&mut InvocationContext, &str) -> StrataResult<R> + Send + Sync>;

/// Why an [`ArgumentGuard`] stopped the pipeline, stored as a context
/// extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentRejection {
    /// Name of the guard.
    pub guard: &'static str,
    /// Message of the failed check.
    pub reason: String,
}

/// Validates positional arguments before anything inward runs.
///
/// Checks run in registration order; the first failure short-circuits with
/// the value the rejection closure produces.
///
/// # Example
///
/// ```
/// use strata_filter::{ArgumentGuard, Arguments, Pipeline};
///
/// # tokio_test::block_on(async {
/// let guard = ArgumentGuard::new("validate_id", |_ctx, reason| Ok(format!("400: {reason}")))
///     .require::<u64>(0)
///     .check(|args| match args.get::<u64>(0) {
///         Some(0) => Err("id must be positive".to_string()),
///         _ => Ok(()),
///     });
///
/// let pipeline = Pipeline::builder()
///     .add_filter(guard)
///     .handler_fn(|ctx| Ok(format!("user {}", ctx.argument::<u64>(0)?)))
///     .build()
///     .unwrap();
///
/// assert_eq!(pipeline.call(Arguments::new().with(7_u64)).await.unwrap(), "user 7");
/// assert_eq!(
///     pipeline.call(Arguments::new().with(0_u64)).await.unwrap(),
///     "400: id must be positive"
/// );
/// # });
/// ```
pub struct ArgumentGuard<R: Send + 'static> {
    name: &'static str,
    checks: Vec<Check>,
    reject: Reject<R>,
}

impl<R: Send + 'static> ArgumentGuard<R> {
    /// Creates a guard with no checks.
    pub fn new<F>(name: &'static str, reject: F) -> Self
    where
        F: Fn(&mut InvocationContext, &str) -> StrataResult<R> + Send + Sync + 'static,
    {
        Self {
            name,
            checks: Vec::new(),
            reject: Box::new(reject),
        }
    }

    /// Adds a check over all arguments.
    #[must_use]
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Arguments) -> Result<(), String> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    /// Requires an argument of type `T` at `index`.
    #[must_use]
    pub fn require<T: Send + Sync + 'static>(self, index: usize) -> Self {
        self.check(move |args| args.try_get::<T>(index).map(|_| ()).map_err(|e| e.to_string()))
    }

    /// Returns the message of the first failing check.
    fn first_failure(&self, args: &Arguments) -> Option<String> {
        self.checks.iter().find_map(|check| check(args).err())
    }
}

impl<R: Send + 'static> Filter<R> for ArgumentGuard<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn before<'a>(&'a self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, StrataResult<Flow<R>>> {
        let flow = match self.first_failure(ctx.arguments()) {
            None => Ok(Flow::Continue),
            Some(reason) => {
                tracing::debug!(
                    invocation_id = %ctx.invocation_id(),
                    stage = self.name,
                    reason = %reason,
                    "arguments rejected"
                );
                let flow = (self.reject)(ctx, &reason).map(Flow::ShortCircuit);
                ctx.set_extension(ArgumentRejection {
                    guard: self.name,
                    reason,
                });
                flow
            }
        };
        Box::pin(async move { flow })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn guarded(calls: Arc<AtomicUsize>) -> Pipeline<String> {
        let guard = ArgumentGuard::new("guard", |_ctx, reason| Ok(format!("rejected: {reason}")))
            .require::<String>(0)
            .check(|args| {
                if args.get::<String>(0).is_some_and(String::is_empty) {
                    Err("name is empty".to_string())
                } else {
                    Ok(())
                }
            });

        Pipeline::builder()
            .add_filter(guard)
            .handler_fn(move |ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(format!("hello {}", ctx.argument::<String>(0)?))
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_arguments_reach_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = guarded(calls.clone());

        let result = pipeline
            .call(Arguments::new().with("ada".to_string()))
            .await
            .unwrap();
        assert_eq!(result, "hello ada");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_argument_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = guarded(calls.clone());

        let mut ctx = InvocationContext::new();
        let result = pipeline.invoke(&mut ctx).await.unwrap();
        assert!(result.starts_with("rejected: "));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.short_circuited_by(), Some("guard"));
        assert_eq!(ctx.get_extension::<ArgumentRejection>().unwrap().guard, "guard");
    }

    #[tokio::test]
    async fn test_checks_run_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = guarded(calls);

        let mut ctx = InvocationContext::with_arguments(Arguments::new().with(String::new()));
        let result = pipeline.invoke(&mut ctx).await.unwrap();
        assert_eq!(result, "rejected: name is empty");
        assert_eq!(
            ctx.get_extension::<ArgumentRejection>().unwrap().reason,
            "name is empty"
        );
    }
}
