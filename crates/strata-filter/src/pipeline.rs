//! Ordered filter pipeline.
//!
//! A [`Pipeline`] is built once from a list of [`FilterStage`]s and a
//! terminal [`Handler`], then invoked any number of times, concurrently if
//! needed. Building sorts the stages into execution order; invoking wraps
//! the handler in one continuation per stage, innermost last.
//!
//! ```text
//! before(A) → before(B) → before(C) → handler
//!                                        ↓
//! after(A)  ←  after(B) ←  after(C)  ←──┘
//! ```

use crate::arguments::Arguments;
use crate::context::InvocationContext;
use crate::filter::{AsyncFnHandler, BoxFuture, Filter, FnHandler, Handler, Next};
use crate::stage::{order_stages, FilterStage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use strata_core::{StrataError, StrataResult};
use strata_telemetry::metrics::{self, InFlightGuard, Outcome};

/// Name given to pipelines built without one.
pub const DEFAULT_PIPELINE_NAME: &str = "pipeline";

/// Build-time limits and runtime switches of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum number of stages, if limited.
    pub max_stages: Option<usize>,

    /// Whether two stages with the same filter name fail the build.
    pub reject_duplicate_names: bool,

    /// Whether invocations record `strata_*` metrics.
    pub record_metrics: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_stages: None,
            reject_duplicate_names: false,
            record_metrics: true,
        }
    }
}

/// An immutable, ordered filter pipeline around one terminal handler.
///
/// # Example
///
/// ```
/// use strata_filter::{Arguments, HookFilter, Pipeline};
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder()
///     .add_filter(HookFilter::new("double").after(|_ctx, n: u32| Ok(n * 2)))
///     .handler_fn(|ctx| Ok(*ctx.argument::<u32>(0)? + 1))
///     .build()
///     .unwrap();
///
/// let result = pipeline.call(Arguments::new().with(20_u32)).await.unwrap();
/// assert_eq!(result, 42);
/// # });
/// ```
pub struct Pipeline<R: Send + 'static> {
    /// Name used in logs, metrics and the context.
    name: String,

    /// Stages in execution order.
    stages: Vec<FilterStage<R>>,

    /// The terminal operation.
    handler: Arc<dyn Handler<R>>,

    options: PipelineOptions,
}

impl<R: Send + 'static> Pipeline<R> {
    /// Creates a builder for a pipeline named `"pipeline"`.
    #[must_use]
    pub fn builder() -> PipelineBuilder<R> {
        PipelineBuilder::new(DEFAULT_PIPELINE_NAME)
    }

    /// Creates a builder for a pipeline with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> PipelineBuilder<R> {
        PipelineBuilder::new(name)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[FilterStage<R>] {
        &self.stages
    }

    /// Returns the names of all stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(FilterStage::name).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the options the pipeline was built with.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs one invocation through the pipeline.
    ///
    /// The context's journal, status and short-circuit marker are reset
    /// first, so a context may be reused. When this returns, the journal
    /// shows how far each stage got and [`InvocationContext::status`] is
    /// `Completed` or `Faulted`.
    ///
    /// Invoking from inside another invocation on the same context (e.g. a
    /// handler calling [`FilterRegistry::invoke`](crate::FilterRegistry::invoke))
    /// runs the nested pipeline on a fresh journal and restores the outer
    /// invocation's progress afterwards.
    pub async fn invoke(&self, ctx: &mut InvocationContext) -> StrataResult<R> {
        let _in_flight = self
            .options
            .record_metrics
            .then(|| InFlightGuard::new(&self.name));
        let started = Instant::now();

        let outer = ctx.suspend();
        ctx.begin(&self.name, &self.stages);
        let outcome = self.build_chain().run(ctx).await;
        ctx.finish(outcome.is_ok());

        let elapsed = started.elapsed();
        match &outcome {
            Ok(_) => tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                pipeline = %self.name,
                short_circuited_by = ctx.short_circuited_by(),
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                "invocation completed"
            ),
            Err(err) => tracing::warn!(
                invocation_id = %ctx.invocation_id(),
                pipeline = %self.name,
                stage = ctx.fault_stage(err),
                error = %err,
                "invocation faulted"
            ),
        }

        if self.options.record_metrics {
            let outcome_label = match (&outcome, ctx.short_circuited_by()) {
                (Err(err), _) => {
                    metrics::record_fault(&self.name, ctx.fault_stage(err));
                    Outcome::Faulted
                }
                (Ok(_), Some(stage)) => {
                    metrics::record_short_circuit(&self.name, stage);
                    Outcome::ShortCircuited
                }
                (Ok(_), None) => Outcome::Completed,
            };
            metrics::record_invocation(&self.name, outcome_label, elapsed);
        }

        if let Some(run) = outer {
            ctx.resume(run);
        }
        outcome
    }

    /// Runs one invocation with a fresh context carrying `arguments`.
    pub async fn call(&self, arguments: Arguments) -> StrataResult<R> {
        let mut ctx = InvocationContext::with_arguments(arguments);
        self.invoke(&mut ctx).await
    }

    /// Builds the continuation chain from back to front.
    fn build_chain(&self) -> Next<'_, R> {
        let mut next = Next::handler(self.handler.as_ref());
        for (index, stage) in self.stages.iter().enumerate().rev() {
            next = Next::new(index, stage, next);
        }
        next
    }
}

impl<R: Send + 'static> std::fmt::Debug for Pipeline<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Pipeline`].
///
/// Stages may be added in any order; [`build`](Self::build) sorts them.
pub struct PipelineBuilder<R: Send + 'static> {
    name: String,
    stages: Vec<FilterStage<R>>,
    handlers: Vec<Arc<dyn Handler<R>>>,
    options: PipelineOptions,
}

impl<R: Send + 'static> PipelineBuilder<R> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            handlers: Vec::new(),
            options: PipelineOptions::default(),
        }
    }

    /// Adds a stage.
    #[must_use]
    pub fn stage(mut self, stage: FilterStage<R>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Adds several stages, keeping their order.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = FilterStage<R>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Adds a filter as an item-scoped stage with priority 0.
    #[must_use]
    pub fn add_filter<F: Filter<R>>(self, filter: F) -> Self {
        self.stage(FilterStage::new(filter))
    }

    /// Sets the terminal handler.
    ///
    /// Setting it more than once makes [`build`](Self::build) fail.
    #[must_use]
    pub fn handler<H: Handler<R>>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Sets a synchronous closure as the terminal handler.
    #[must_use]
    pub fn handler_fn<F>(self, func: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> StrataResult<R> + Send + Sync + 'static,
    {
        self.handler(FnHandler::new(func))
    }

    /// Sets a closure returning a boxed future as the terminal handler.
    #[must_use]
    pub fn handler_async<F>(self, func: F) -> Self
    where
        F: for<'c> Fn(&'c mut InvocationContext) -> BoxFuture<'c, StrataResult<R>>
            + Send
            + Sync
            + 'static,
    {
        self.handler(AsyncFnHandler::new(func))
    }

    /// Replaces the build options.
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the stages added so far, in registration order.
    #[must_use]
    pub fn pending_stages(&self) -> &[FilterStage<R>] {
        &self.stages
    }

    /// Validates the registration and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if there is no handler or more than
    /// one, if the stage count exceeds `max_stages`, or if duplicate stage
    /// names are rejected and present.
    pub fn build(self) -> StrataResult<Pipeline<R>> {
        let mut handlers = self.handlers.into_iter();
        let handler = handlers.next().ok_or_else(|| {
            StrataError::configuration(format!("pipeline '{}' has no handler", self.name))
        })?;
        if handlers.next().is_some() {
            return Err(StrataError::configuration(format!(
                "pipeline '{}' has more than one handler",
                self.name
            )));
        }

        if let Some(max) = self.options.max_stages {
            if self.stages.len() > max {
                return Err(StrataError::configuration(format!(
                    "pipeline '{}' has {} stages, the maximum is {max}",
                    self.name,
                    self.stages.len()
                )));
            }
        }

        if self.options.reject_duplicate_names {
            let mut seen = HashSet::new();
            if let Some(stage) = self.stages.iter().find(|s| !seen.insert(s.name())) {
                return Err(StrataError::configuration(format!(
                    "pipeline '{}' registers stage '{}' more than once",
                    self.name,
                    stage.name()
                )));
            }
        }

        let stages = order_stages(self.stages);
        tracing::debug!(
            pipeline = %self.name,
            stages = ?stages.iter().map(FilterStage::name).collect::<Vec<_>>(),
            "pipeline built"
        );

        Ok(Pipeline {
            name: self.name,
            stages,
            handler,
            options: self.options,
        })
    }
}
