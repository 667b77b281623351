//! Inner-chain timing.

use crate::context::InvocationContext;
use crate::filter::{BoxFuture, Filter, Next};
use std::time::{Duration, Instant};
use strata_core::StrataResult;

/// Elapsed times recorded by [`TimingFilter`]s, stored as a context
/// extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTimings {
    entries: Vec<(&'static str, Duration)>,
}

impl StageTimings {
    /// Returns the time measured by the filter named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, elapsed)| *elapsed)
    }

    /// Returns all measurements, innermost first.
    #[must_use]
    pub fn entries(&self) -> &[(&'static str, Duration)] {
        &self.entries
    }
}

/// Measures how long everything inward of it takes.
///
/// The measurement is recorded whether the inner chain succeeds or fails.
#[derive(Debug, Clone, Copy)]
pub struct TimingFilter {
    name: &'static str,
}

impl TimingFilter {
    /// Creates a timing filter.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for TimingFilter {
    fn default() -> Self {
        Self::new("timing")
    }
}

impl<R: Send + 'static> Filter<R> for TimingFilter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StrataResult<R>> {
        Box::pin(async move {
            let started = Instant::now();
            let outcome = next.run(ctx).await;
            let elapsed = started.elapsed();

            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                stage = self.name,
                ok = outcome.is_ok(),
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                "inner chain timed"
            );

            if let Some(timings) = ctx.get_extension_mut::<StageTimings>() {
                timings.entries.push((self.name, elapsed));
            } else {
                ctx.set_extension(StageTimings {
                    entries: vec![(self.name, elapsed)],
                });
            }

            outcome
        })
    }
}
