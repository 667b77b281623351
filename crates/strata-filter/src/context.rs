//! Invocation context types.
//!
//! The [`InvocationContext`] carries the state of one call through the
//! filter pipeline: the positional arguments of the wrapped operation, the
//! short-circuit flag, a cooperative cancellation flag, typed extensions and
//! the stage journal.

use crate::arguments::Arguments;
use crate::journal::{Journal, PipelineStatus};
use crate::stage::FilterStage;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_core::{InvocationId, StrataError, StrataResult};

/// Cooperative cancellation signal shared between a caller and one invocation.
///
/// The executor never preempts a stage. Stages observe the flag and decide
/// whether to short-circuit.
///
/// # Example
///
/// ```
/// use strata_filter::CancellationFlag;
///
/// let flag = CancellationFlag::new();
/// let observer = flag.clone();
/// flag.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Context that flows through the filter pipeline for one invocation.
///
/// A context is created per call and owned exclusively by the executor while
/// the pipeline runs. It is not meant to be shared across invocations.
///
/// # Example
///
/// ```
/// use strata_filter::{Arguments, InvocationContext};
///
/// let mut ctx = InvocationContext::with_arguments(Arguments::new().with(5_u32));
/// assert_eq!(*ctx.argument::<u32>(0).unwrap(), 5);
///
/// *ctx.argument_mut::<u32>(0).unwrap() = 6;
/// assert_eq!(ctx.arguments().get::<u32>(0), Some(&6));
/// ```
#[derive(Debug)]
pub struct InvocationContext {
    /// Unique identifier for this invocation.
    invocation_id: InvocationId,

    /// Name of the pipeline currently (or last) running this context.
    pipeline: Option<String>,

    /// Positional arguments of the wrapped operation.
    arguments: Arguments,

    /// Cooperative cancellation signal.
    cancellation: CancellationFlag,

    /// Stage that produced the result without calling inward.
    short_circuited_by: Option<&'static str>,

    /// Innermost stage whose error is propagating (or reached the caller).
    faulted_stage: Option<&'static str>,

    /// Per-stage progress.
    journal: Journal,

    /// Overall progress.
    status: PipelineStatus,

    /// When the invocation was created.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl InvocationContext {
    /// Creates a context with no arguments and a fresh invocation ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_arguments(Arguments::new())
    }

    /// Creates a context carrying the given arguments.
    #[must_use]
    pub fn with_arguments(arguments: Arguments) -> Self {
        Self {
            invocation_id: InvocationId::new(),
            pipeline: None,
            arguments,
            cancellation: CancellationFlag::new(),
            short_circuited_by: None,
            faulted_stage: None,
            journal: Journal::default(),
            status: PipelineStatus::Ready,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Uses an invocation ID supplied by the caller.
    #[must_use]
    pub fn with_invocation_id(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = invocation_id;
        self
    }

    /// Shares a cancellation flag with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Returns the invocation ID.
    #[must_use]
    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Returns the name of the pipeline running this context.
    #[must_use]
    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Returns the positional arguments for rewriting.
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// Returns the argument at `index` as `T`.
    pub fn argument<T: Send + Sync + 'static>(&self, index: usize) -> StrataResult<&T> {
        self.arguments.try_get(index)
    }

    /// Returns the argument at `index` as a mutable `T`.
    pub fn argument_mut<T: Send + Sync + 'static>(&mut self, index: usize) -> StrataResult<&mut T> {
        let len = self.arguments.len();
        if index >= len {
            return Err(StrataError::argument_missing(index, len));
        }
        self.arguments
            .get_mut(index)
            .ok_or_else(|| StrataError::argument_type(index, std::any::type_name::<T>()))
    }

    /// Returns the cancellation flag.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the stage that short-circuited the pipeline, if any.
    #[must_use]
    pub fn short_circuited_by(&self) -> Option<&'static str> {
        self.short_circuited_by
    }

    /// Returns the innermost stage that raised the error now propagating,
    /// or the one that reached the caller.
    ///
    /// Set for every error category, including argument and cancellation
    /// errors that carry no stage themselves. Cleared once a stage recovers
    /// from the error and returns a result.
    #[must_use]
    pub fn faulted_stage(&self) -> Option<&'static str> {
        self.faulted_stage
    }

    /// Returns the stage `err` is attributed to: the one it names, otherwise
    /// the one recorded while it propagated.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_filter::{HookFilter, InvocationContext, Pipeline};
    ///
    /// # tokio_test::block_on(async {
    /// let pipeline = Pipeline::<u64>::builder()
    ///     .add_filter(HookFilter::new("gate").before(|ctx| {
    ///         ctx.argument::<u64>(0)?;
    ///         Ok(strata_filter::Flow::Continue)
    ///     }))
    ///     .handler_fn(|_ctx| Ok(1))
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut ctx = InvocationContext::new();
    /// let err = pipeline.invoke(&mut ctx).await.unwrap_err();
    /// assert_eq!(ctx.fault_stage(&err), Some("gate"));
    /// # });
    /// ```
    #[must_use]
    pub fn fault_stage<'a>(&'a self, err: &'a StrataError) -> Option<&'a str> {
        err.stage().or(self.faulted_stage)
    }

    /// Returns the stage journal of the current (or last) invocation.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Returns the overall invocation status.
    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Returns when the context was created.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_filter::InvocationContext;
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = InvocationContext::new();
    /// ctx.set_extension(Tenant("acme"));
    /// assert_eq!(ctx.get_extension::<Tenant>(), Some(&Tenant("acme")));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Retrieves a typed extension value for modification.
    pub fn get_extension_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn begin<R>(&mut self, pipeline: &str, stages: &[FilterStage<R>])
    where
        R: Send + 'static,
    {
        self.pipeline = Some(pipeline.to_string());
        self.short_circuited_by = None;
        self.faulted_stage = None;
        self.journal.reset(stages);
        self.status = PipelineStatus::Running;
    }

    /// Sets aside the progress of a running invocation so another pipeline
    /// can run on this context. Returns `None` if nothing is running.
    pub(crate) fn suspend(&mut self) -> Option<SuspendedRun> {
        if self.status != PipelineStatus::Running {
            return None;
        }
        Some(SuspendedRun {
            pipeline: self.pipeline.take(),
            short_circuited_by: self.short_circuited_by.take(),
            faulted_stage: self.faulted_stage.take(),
            journal: std::mem::take(&mut self.journal),
            status: self.status,
        })
    }

    /// Puts back progress saved by [`suspend`](Self::suspend).
    pub(crate) fn resume(&mut self, run: SuspendedRun) {
        self.pipeline = run.pipeline;
        self.short_circuited_by = run.short_circuited_by;
        self.faulted_stage = run.faulted_stage;
        self.journal = run.journal;
        self.status = run.status;
    }

    pub(crate) fn finish(&mut self, completed: bool) {
        self.status = if completed {
            PipelineStatus::Completed
        } else {
            PipelineStatus::Faulted
        };
    }

    pub(crate) fn enter_stage(&mut self, index: usize) {
        self.journal.enter(index);
    }

    pub(crate) fn delegate_stage(&mut self, index: usize) {
        self.journal.delegate(index);
    }

    pub(crate) fn short_circuit_stage(&mut self, index: usize) {
        self.journal.short_circuit(index);
    }

    /// Keeps the innermost attribution.
    pub(crate) fn note_fault(&mut self, stage: &'static str) {
        if self.faulted_stage.is_none() {
            self.faulted_stage = Some(stage);
        }
    }

    pub(crate) fn clear_fault(&mut self) {
        self.faulted_stage = None;
    }

    /// Returns `true` if the stage short-circuited.
    pub(crate) fn unwind_stage(&mut self, index: usize, name: &'static str) -> bool {
        let short_circuited = self.journal.unwind(index);
        if short_circuited && self.short_circuited_by.is_none() {
            self.short_circuited_by = Some(name);
        }
        short_circuited
    }
}

/// Progress of an outer invocation while a nested one runs on the same context.
#[derive(Debug)]
pub(crate) struct SuspendedRun {
    pipeline: Option<String>,
    short_circuited_by: Option<&'static str>,
    faulted_stage: Option<&'static str>,
    journal: Journal,
    status: PipelineStatus,
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}
