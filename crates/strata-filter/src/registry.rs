//! Filter registration at three granularities.
//!
//! A [`FilterRegistry`] owns one [`Pipeline`] per target name. Each pipeline
//! combines the registry's global stages, the stages of every
//! [`FilterGroup`] its [`Endpoint`] joined, and the endpoint's own stages.
//! The scope of each stage is fixed by where it was registered, so at equal
//! priority global stages wrap group stages, which wrap item stages.
//!
//! # Example
//!
//! ```
//! use strata_filter::{Endpoint, FilterGroup, FilterRegistry, HookFilter, InvocationContext};
//!
//! # tokio_test::block_on(async {
//! let mut registry = FilterRegistry::new();
//! registry.add_global_filter(HookFilter::new("audit"));
//!
//! let admin = FilterGroup::new("admin").add_filter(HookFilter::new("require_admin"));
//!
//! registry
//!     .register(
//!         Endpoint::new("delete_user")
//!             .join(&admin)
//!             .add_filter(HookFilter::new("validate"))
//!             .handler_fn(|_ctx| Ok("deleted")),
//!     )
//!     .unwrap();
//!
//! let pipeline = registry.get("delete_user").unwrap();
//! assert_eq!(pipeline.stage_names(), vec!["audit", "require_admin", "validate"]);
//!
//! let mut ctx = InvocationContext::new();
//! assert_eq!(registry.invoke("delete_user", &mut ctx).await.unwrap(), "deleted");
//! # });
//! ```

use crate::arguments::Arguments;
use crate::context::InvocationContext;
use crate::filter::{BoxFuture, Filter, Handler};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineOptions};
use crate::stage::{FilterStage, Scope};
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult};

/// A named set of stages shared by several endpoints.
pub struct FilterGroup<R: Send + 'static> {
    name: String,
    stages: Vec<FilterStage<R>>,
}

impl<R: Send + 'static> FilterGroup<R> {
    /// Creates an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage, re-scoped to [`Scope::Group`].
    #[must_use]
    pub fn stage(mut self, stage: FilterStage<R>) -> Self {
        self.stages.push(stage.with_scope(Scope::Group));
        self
    }

    /// Adds a filter with priority 0.
    #[must_use]
    pub fn add_filter<F: Filter<R>>(self, filter: F) -> Self {
        self.stage(FilterStage::new(filter))
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the group's stages in registration order.
    #[must_use]
    pub fn stages(&self) -> &[FilterStage<R>] {
        &self.stages
    }
}

/// One registry target: its handler, its own stages and the groups it joined.
pub struct Endpoint<R: Send + 'static> {
    target: String,
    groups: Vec<String>,
    builder: PipelineBuilder<R>,
    options: Option<PipelineOptions>,
}

impl<R: Send + 'static> Endpoint<R> {
    /// Creates an endpoint for `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            builder: PipelineBuilder::new(target.clone()),
            target,
            groups: Vec::new(),
            options: None,
        }
    }

    /// Returns the target name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the names of the groups joined so far.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Adds the group's stages to this endpoint.
    #[must_use]
    pub fn join(mut self, group: &FilterGroup<R>) -> Self {
        self.groups.push(group.name.clone());
        self.builder = self.builder.stages(group.stages.iter().cloned());
        self
    }

    /// Adds a stage, re-scoped to [`Scope::Item`].
    #[must_use]
    pub fn stage(mut self, stage: FilterStage<R>) -> Self {
        self.builder = self.builder.stage(stage.with_scope(Scope::Item));
        self
    }

    /// Adds a filter with priority 0.
    #[must_use]
    pub fn add_filter<F: Filter<R>>(self, filter: F) -> Self {
        self.stage(FilterStage::new(filter))
    }

    /// Sets the terminal handler.
    #[must_use]
    pub fn handler<H: Handler<R>>(mut self, handler: H) -> Self {
        self.builder = self.builder.handler(handler);
        self
    }

    /// Sets a synchronous closure as the terminal handler.
    #[must_use]
    pub fn handler_fn<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> StrataResult<R> + Send + Sync + 'static,
    {
        self.builder = self.builder.handler_fn(func);
        self
    }

    /// Sets a closure returning a boxed future as the terminal handler.
    #[must_use]
    pub fn handler_async<F>(mut self, func: F) -> Self
    where
        F: for<'c> Fn(&'c mut InvocationContext) -> BoxFuture<'c, StrataResult<R>>
            + Send
            + Sync
            + 'static,
    {
        self.builder = self.builder.handler_async(func);
        self
    }

    /// Overrides the registry's pipeline options for this endpoint.
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Targets and their pipelines.
///
/// Registration takes `&mut self`; invocation takes `&self`, so a populated
/// registry can be shared behind an `Arc`.
pub struct FilterRegistry<R: Send + 'static> {
    global: Vec<FilterStage<R>>,
    pipelines: HashMap<String, Arc<Pipeline<R>>>,
    options: PipelineOptions,
}

impl<R: Send + 'static> FilterRegistry<R> {
    /// Creates an empty registry with default pipeline options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    /// Creates an empty registry whose pipelines use `options`.
    #[must_use]
    pub fn with_options(options: PipelineOptions) -> Self {
        Self {
            global: Vec::new(),
            pipelines: HashMap::new(),
            options,
        }
    }

    /// Adds a stage, re-scoped to [`Scope::Global`].
    ///
    /// Applies to endpoints registered afterwards.
    pub fn global_stage(&mut self, stage: FilterStage<R>) -> &mut Self {
        self.global.push(stage.with_scope(Scope::Global));
        self
    }

    /// Adds a global filter with priority 0.
    pub fn add_global_filter<F: Filter<R>>(&mut self, filter: F) -> &mut Self {
        self.global_stage(FilterStage::new(filter))
    }

    /// Returns the global stages in registration order.
    #[must_use]
    pub fn global_stages(&self) -> &[FilterStage<R>] {
        &self.global
    }

    /// Builds and stores the pipeline for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the target is already registered or
    /// the pipeline fails to build.
    pub fn register(&mut self, endpoint: Endpoint<R>) -> StrataResult<Arc<Pipeline<R>>> {
        if self.pipelines.contains_key(&endpoint.target) {
            return Err(StrataError::configuration(format!(
                "target '{}' is already registered",
                endpoint.target
            )));
        }

        let options = endpoint.options.unwrap_or_else(|| self.options.clone());
        let pipeline = endpoint
            .builder
            .stages(self.global.iter().cloned())
            .with_options(options)
            .build()?;

        tracing::debug!(
            target_name = %endpoint.target,
            groups = ?endpoint.groups,
            stages = pipeline.stage_count(),
            "target registered"
        );

        let pipeline = Arc::new(pipeline);
        self.pipelines.insert(endpoint.target, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Returns the pipeline registered for `target`.
    #[must_use]
    pub fn get(&self, target: &str) -> Option<Arc<Pipeline<R>>> {
        self.pipelines.get(target).cloned()
    }

    /// Returns `true` if `target` is registered.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.pipelines.contains_key(target)
    }

    /// Returns the registered target names, sorted.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }

    /// Runs `ctx` through the pipeline registered for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::NotFound`] for an unknown target, otherwise
    /// whatever the pipeline returns.
    pub async fn invoke(&self, target: &str, ctx: &mut InvocationContext) -> StrataResult<R> {
        let pipeline = self
            .pipelines
            .get(target)
            .ok_or_else(|| StrataError::not_found(target))?;
        pipeline.invoke(ctx).await
    }

    /// Runs the pipeline for `target` with a fresh context.
    pub async fn call(&self, target: &str, arguments: Arguments) -> StrataResult<R> {
        let mut ctx = InvocationContext::with_arguments(arguments);
        self.invoke(target, &mut ctx).await
    }
}

impl<R: Send + 'static> Default for FilterRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + 'static> std::fmt::Debug for FilterRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("global", &self.global)
            .field("targets", &self.targets())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::HookFilter;
    use strata_core::ErrorCategory;

    fn noop(name: &'static str) -> HookFilter<&'static str> {
        HookFilter::new(name)
    }

    #[test]
    fn test_group_forces_scope() {
        let group = FilterGroup::new("g")
            .stage(FilterStage::new(noop("a")).with_scope(Scope::Global))
            .add_filter(noop("b"));
        assert_eq!(group.name(), "g");
        assert!(group.stages().iter().all(|s| s.scope() == Scope::Group));
    }

    #[test]
    fn test_scopes_break_priority_ties() {
        let mut registry = FilterRegistry::new();
        let group = FilterGroup::new("g").add_filter(noop("group"));

        registry.add_global_filter(noop("global"));
        registry
            .register(
                Endpoint::new("t")
                    .add_filter(noop("item"))
                    .join(&group)
                    .handler_fn(|_ctx| Ok("ok")),
            )
            .unwrap();

        let pipeline = registry.get("t").unwrap();
        assert_eq!(pipeline.stage_names(), vec!["global", "group", "item"]);
    }

    #[test]
    fn test_priority_beats_scope() {
        let mut registry = FilterRegistry::new();
        registry.global_stage(FilterStage::new(noop("global")).with_priority(10));

        let pipeline = registry
            .register(
                Endpoint::new("t")
                    .stage(FilterStage::new(noop("item")).with_priority(-10))
                    .handler_fn(|_ctx| Ok("ok")),
            )
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["item", "global"]);
        assert_eq!(pipeline.stages()[0].scope(), Scope::Item);
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut registry = FilterRegistry::new();
        registry
            .register(Endpoint::new("t").handler_fn(|_ctx| Ok("one")))
            .unwrap();

        let err = registry
            .register(Endpoint::new("t").handler_fn(|_ctx| Ok("two")))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_endpoint_without_handler_rejected() {
        let mut registry: FilterRegistry<()> = FilterRegistry::new();
        let err = registry.register(Endpoint::new("t")).unwrap_err();
        assert!(err.to_string().contains("no handler"));
        assert!(!registry.contains("t"));
    }

    #[test]
    fn test_endpoint_options_override_registry() {
        let strict = PipelineOptions {
            max_stages: Some(0),
            ..PipelineOptions::default()
        };
        let mut registry = FilterRegistry::with_options(strict);
        registry.add_global_filter(noop("global"));

        assert!(registry
            .register(Endpoint::new("strict").handler_fn(|_ctx| Ok("x")))
            .is_err());

        assert!(registry
            .register(
                Endpoint::new("relaxed")
                    .with_options(PipelineOptions::default())
                    .handler_fn(|_ctx| Ok("x")),
            )
            .is_ok());
        assert_eq!(registry.targets(), vec!["relaxed"]);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let registry: FilterRegistry<u8> = FilterRegistry::new();
        let err = registry.call("missing", Arguments::new()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_invoke_routes_to_target() {
        let mut registry = FilterRegistry::new();
        registry
            .register(Endpoint::new("a").handler_fn(|_ctx| Ok("from a")))
            .unwrap();
        registry
            .register(Endpoint::new("b").handler_fn(|_ctx| Ok("from b")))
            .unwrap();

        let mut ctx = InvocationContext::new();
        assert_eq!(registry.invoke("b", &mut ctx).await.unwrap(), "from b");
        assert_eq!(ctx.pipeline(), Some("b"));
        assert_eq!(registry.targets(), vec!["a", "b"]);
    }

    #[test]
    fn test_endpoint_records_groups() {
        let g1: FilterGroup<()> = FilterGroup::new("g1");
        let g2: FilterGroup<()> = FilterGroup::new("g2");
        let endpoint = Endpoint::new("t").join(&g1).join(&g2);
        assert_eq!(endpoint.target(), "t");
        assert_eq!(endpoint.groups(), ["g1".to_string(), "g2".to_string()]);
    }
}
