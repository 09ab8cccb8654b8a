//! Per-state aggregate counts for one queue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{LifecycleState, StateFilter};

/// Number of items in each lifecycle state of a queue.
///
/// Every state is always present; states the engine did not report count as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateCounts(BTreeMap<LifecycleState, u64>);

impl AggregateCounts {
    /// Counts with every state at zero.
    pub fn new() -> Self {
        Self(LifecycleState::ALL.into_iter().map(|s| (s, 0)).collect())
    }

    /// Count for a single state.
    pub fn get(&self, state: LifecycleState) -> u64 {
        self.0.get(&state).copied().unwrap_or(0)
    }

    /// Overwrite the count for a state.
    pub fn set(&mut self, state: LifecycleState, count: u64) {
        self.0.insert(state, count);
    }

    /// Add to the count for a state.
    pub fn add(&mut self, state: LifecycleState, count: u64) {
        *self.0.entry(state).or_insert(0) += count;
    }

    /// Total across all states.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Items selected by `filter`; the grand total for [`StateFilter::Latest`].
    pub fn matching(&self, filter: StateFilter) -> u64 {
        match filter {
            StateFilter::Latest => self.total(),
            StateFilter::State(state) => self.get(state),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LifecycleState, u64)> + '_ {
        self.0.iter().map(|(s, c)| (*s, *c))
    }
}

impl Default for AggregateCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(LifecycleState, u64)> for AggregateCounts {
    fn from_iter<I: IntoIterator<Item = (LifecycleState, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (state, count) in iter {
            counts.add(state, count);
        }
        counts
    }
}
