//! Lifecycle states and the filters built on top of them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a work item, in the monitor's canonical vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Waiting to be picked up by a worker.
    Waiting,
    /// Being processed by a worker.
    Active,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Scheduled to become waiting at a later time.
    Delayed,
    /// Held back while the queue is paused.
    Paused,
}

impl LifecycleState {
    /// Every state, in display order.
    pub const ALL: [LifecycleState; 6] = [
        LifecycleState::Waiting,
        LifecycleState::Active,
        LifecycleState::Completed,
        LifecycleState::Failed,
        LifecycleState::Delayed,
        LifecycleState::Paused,
    ];

    /// Get the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Waiting => "waiting",
            LifecycleState::Active => "active",
            LifecycleState::Completed => "completed",
            LifecycleState::Failed => "failed",
            LifecycleState::Delayed => "delayed",
            LifecycleState::Paused => "paused",
        }
    }

    /// Check if items in this state are finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Failed)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a state or filter name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for LifecycleState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Selects which items a page query or a bulk operation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StateFilter {
    /// No state restriction, most recent items first.
    #[default]
    Latest,
    /// Only items in the given state.
    State(LifecycleState),
}

impl StateFilter {
    /// Check whether an item in `state` passes this filter.
    pub fn matches(&self, state: LifecycleState) -> bool {
        match self {
            StateFilter::Latest => true,
            StateFilter::State(wanted) => *wanted == state,
        }
    }

    /// The concrete state selected, if any.
    pub fn state(&self) -> Option<LifecycleState> {
        match self {
            StateFilter::Latest => None,
            StateFilter::State(state) => Some(*state),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Latest => "latest",
            StateFilter::State(state) => state.as_str(),
        }
    }
}

impl From<LifecycleState> for StateFilter {
    fn from(state: LifecycleState) -> Self {
        StateFilter::State(state)
    }
}

impl std::fmt::Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateFilter {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "latest" {
            Ok(StateFilter::Latest)
        } else {
            s.parse().map(StateFilter::State)
        }
    }
}

impl From<StateFilter> for String {
    fn from(filter: StateFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl TryFrom<String> for StateFilter {
    type Error = UnknownState;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
