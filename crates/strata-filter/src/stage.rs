//! Filter stages and their ordering.
//!
//! A [`FilterStage`] pairs a filter with the two values that decide where it
//! runs: a numeric priority (lower runs earlier) and a [`Scope`] used to
//! break priority ties. Remaining ties keep registration order.

use crate::filter::Filter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registration granularity of a stage.
///
/// Scopes only matter when priorities are equal: global stages run outside
/// group stages, which run outside item stages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Applies to every target of a registry.
    Global,
    /// Applies to every target that joined a group.
    Group,
    /// Applies to a single target.
    #[default]
    Item,
}

impl Scope {
    /// Returns the scope name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Group => "group",
            Self::Item => "item",
        }
    }
}

/// A filter registered with a priority and scope.
///
/// Stages are cheap to clone: the filter itself is shared, so one filter
/// instance can serve many pipelines and many concurrent invocations.
///
/// # Example
///
/// ```
/// use strata_filter::{FilterStage, HookFilter, Scope};
///
/// let stage: FilterStage<String> = FilterStage::new(HookFilter::new("audit"))
///     .with_priority(-10)
///     .with_scope(Scope::Global);
///
/// assert_eq!(stage.name(), "audit");
/// assert_eq!(stage.priority(), -10);
/// assert_eq!(stage.scope(), Scope::Global);
/// ```
pub struct FilterStage<R: Send + 'static> {
    priority: i32,
    scope: Scope,
    filter: Arc<dyn Filter<R>>,
}

impl<R> FilterStage<R>
where
    R: Send + 'static,
{
    /// Creates an item-scoped stage with priority 0.
    pub fn new<F: Filter<R>>(filter: F) -> Self {
        Self::from_arc(Arc::new(filter))
    }

    /// Creates a stage from an already shared filter.
    pub fn from_arc(filter: Arc<dyn Filter<R>>) -> Self {
        Self {
            priority: 0,
            scope: Scope::default(),
            filter,
        }
    }

    /// Sets the priority. Lower values run earlier.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns the filter name.
    pub fn name(&self) -> &'static str {
        self.filter.name()
    }

    /// Returns the priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the filter.
    pub fn filter(&self) -> &dyn Filter<R> {
        self.filter.as_ref()
    }
}

impl<R: Send + 'static> Clone for FilterStage<R> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            scope: self.scope,
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<R> std::fmt::Debug for FilterStage<R>
where
    R: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStage")
            .field("name", &self.name())
            .field("priority", &self.priority)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Sorts stages into execution order.
///
/// Priority ascending, then scope (global, group, item), then registration
/// order. The sort is stable, which provides the last tie-break.
pub fn order_stages<R>(mut stages: Vec<FilterStage<R>>) -> Vec<FilterStage<R>>
where
    R: Send + 'static,
{
    stages.sort_by_key(|stage| (stage.priority, stage.scope));
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::HookFilter;
    use proptest::prelude::*;

    fn stage(name: &'static str, priority: i32, scope: Scope) -> FilterStage<()> {
        FilterStage::new(HookFilter::new(name))
            .with_priority(priority)
            .with_scope(scope)
    }

    fn names(stages: &[FilterStage<()>]) -> Vec<&'static str> {
        stages.iter().map(FilterStage::name).collect()
    }

    #[test]
    fn test_defaults() {
        let s: FilterStage<()> = FilterStage::new(HookFilter::new("a"));
        assert_eq!(s.priority(), 0);
        assert_eq!(s.scope(), Scope::Item);
    }

    #[test]
    fn test_scope_ordering() {
        assert!(Scope::Global < Scope::Group);
        assert!(Scope::Group < Scope::Item);
        assert_eq!(Scope::Group.name(), "group");
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let ordered = order_stages(vec![
            stage("a", 0, Scope::Item),
            stage("b", 0, Scope::Item),
            stage("c", 0, Scope::Item),
        ]);
        assert_eq!(names(&ordered), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lower_priority_runs_first() {
        let ordered = order_stages(vec![stage("a", 0, Scope::Item), stage("b", -1, Scope::Item)]);
        assert_eq!(names(&ordered), vec!["b", "a"]);
    }

    #[test]
    fn test_scope_breaks_priority_ties() {
        let ordered = order_stages(vec![
            stage("item", 0, Scope::Item),
            stage("group", 0, Scope::Group),
            stage("global", 0, Scope::Global),
        ]);
        assert_eq!(names(&ordered), vec!["global", "group", "item"]);
    }

    #[test]
    fn test_priority_beats_scope() {
        let ordered = order_stages(vec![
            stage("global", 5, Scope::Global),
            stage("item", -5, Scope::Item),
        ]);
        assert_eq!(names(&ordered), vec!["item", "global"]);
    }

    #[test]
    fn test_clone_shares_filter() {
        let original = stage("shared", 3, Scope::Group);
        let copy = original.clone();
        assert_eq!(copy.name(), "shared");
        assert_eq!(copy.priority(), 3);
        assert!(format!("{copy:?}").contains("shared"));
    }

    fn scope_strategy() -> impl Strategy<Value = Scope> {
        prop_oneof![Just(Scope::Global), Just(Scope::Group), Just(Scope::Item)]
    }

    proptest! {
        #[test]
        fn prop_order_is_sorted_and_stable(
            entries in proptest::collection::vec((-3_i32..3, scope_strategy()), 0..12)
        ) {
            const NAMES: [&str; 12] = ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11"];
            let stages: Vec<FilterStage<()>> = entries
                .iter()
                .enumerate()
                .map(|(i, (priority, scope))| stage(NAMES[i], *priority, *scope))
                .collect();

            let ordered = order_stages(stages);
            let position = |name: &str| NAMES.iter().position(|n| *n == name).unwrap();

            for pair in ordered.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!((a.priority(), a.scope()) <= (b.priority(), b.scope()));
                if (a.priority(), a.scope()) == (b.priority(), b.scope()) {
                    prop_assert!(position(a.name()) < position(b.name()));
                }
            }
        }

        #[test]
        fn prop_strictly_lowest_priority_runs_first(
            priorities in proptest::collection::vec(0_i32..10, 1..8),
            pick in 0_usize..8
        ) {
            const NAMES: [&str; 8] = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"];
            let k = pick % priorities.len();
            let stages: Vec<FilterStage<()>> = priorities
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let priority = if i == k { -1 } else { *p };
                    stage(NAMES[i], priority, Scope::Item)
                })
                .collect();

            let ordered = order_stages(stages);
            prop_assert_eq!(ordered[0].name(), NAMES[k]);
        }
    }
}
