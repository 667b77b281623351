//! Per-invocation record of stage progress.
//!
//! Each stage moves through
//! `Pending -> Entered -> (ShortCircuited | Delegated) -> Unwound`.
//! A stage that is still `Entered` or `Delegated` after the invocation ended
//! was cut off by a fault raised further in.

use crate::stage::{FilterStage, Scope};
use serde::Serialize;

/// State of one stage within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Not reached yet.
    Pending,
    /// Its filter started running.
    Entered,
    /// Produced a result without calling inward. Stays visible only until
    /// the stage returns, unless the stage then faults.
    ShortCircuited,
    /// Called into the rest of the chain.
    Delegated,
    /// Returned its result outward.
    Unwound,
}

/// Overall state of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// The context has not been run through a pipeline.
    Ready,
    /// The pipeline is executing.
    Running,
    /// A result reached the caller.
    Completed,
    /// An error reached the caller.
    Faulted,
}

/// Journal entry for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// Filter name.
    pub name: &'static str,
    /// Priority the stage was registered with.
    pub priority: i32,
    /// Scope the stage was registered with.
    pub scope: Scope,
    /// Current state.
    pub state: StageState,
    /// Whether the stage stopped the pipeline instead of delegating.
    pub short_circuited: bool,
}

/// Stage records in execution order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Journal {
    records: Vec<StageRecord>,
}

impl Journal {
    pub(crate) fn reset<R>(&mut self, stages: &[FilterStage<R>])
    where
        R: Send + 'static,
    {
        self.records = stages
            .iter()
            .map(|stage| StageRecord {
                name: stage.name(),
                priority: stage.priority(),
                scope: stage.scope(),
                state: StageState::Pending,
                short_circuited: false,
            })
            .collect();
    }

    pub(crate) fn enter(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.state = StageState::Entered;
        }
    }

    pub(crate) fn delegate(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.state = StageState::Delegated;
        }
    }

    pub(crate) fn short_circuit(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            if record.state == StageState::Entered {
                record.state = StageState::ShortCircuited;
                record.short_circuited = true;
            }
        }
    }

    /// Marks the stage unwound; returns `true` if it never delegated.
    ///
    /// A stage still `Entered` here returned without calling inward and
    /// counts as short-circuited.
    pub(crate) fn unwind(&mut self, index: usize) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        if matches!(record.state, StageState::Entered | StageState::ShortCircuited) {
            record.short_circuited = true;
        }
        record.state = StageState::Unwound;
        record.short_circuited
    }

    /// Returns all records in execution order.
    #[must_use]
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Returns the record of the first stage named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns the state of the first stage named `name`.
    #[must_use]
    pub fn state_of(&self, name: &str) -> Option<StageState> {
        self.get(name).map(|r| r.state)
    }

    /// Returns the names of stages whose filter started, in order.
    #[must_use]
    pub fn entered(&self) -> Vec<&'static str> {
        self.records
            .iter()
            .filter(|r| r.state != StageState::Pending)
            .map(|r| r.name)
            .collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the journal has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
