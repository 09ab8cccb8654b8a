//! Translation between the monitor's lifecycle states and an engine's own names.

use monitor_core::LifecycleState;

/// Maps canonical lifecycle states to the spellings an engine stores.
///
/// Engines name states differently (`pending` vs `waiting`, `wait` when
/// cleaning); that difference stays in the adapter and never leaks into
/// [`LifecycleState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateVocabulary {
    names: [(LifecycleState, &'static str); 6],
}

impl StateVocabulary {
    /// Engine uses the canonical names unchanged.
    pub const CANONICAL: StateVocabulary = StateVocabulary {
        names: [
            (LifecycleState::Waiting, "waiting"),
            (LifecycleState::Active, "active"),
            (LifecycleState::Completed, "completed"),
            (LifecycleState::Failed, "failed"),
            (LifecycleState::Delayed, "delayed"),
            (LifecycleState::Paused, "paused"),
        ],
    };

    /// Names used by the SurrealDB item table.
    pub const SURREAL: StateVocabulary = StateVocabulary {
        names: [
            (LifecycleState::Waiting, "pending"),
            (LifecycleState::Active, "running"),
            (LifecycleState::Completed, "completed"),
            (LifecycleState::Failed, "failed"),
            (LifecycleState::Delayed, "scheduled"),
            (LifecycleState::Paused, "paused"),
        ],
    };

    /// Build a custom table. Each state must appear exactly once.
    pub const fn new(names: [(LifecycleState, &'static str); 6]) -> Self {
        Self { names }
    }

    /// Engine name for a canonical state.
    pub fn encode(&self, state: LifecycleState) -> &'static str {
        self.names
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, name)| *name)
            .unwrap_or_else(|| state.as_str())
    }

    /// Canonical state for an engine name.
    pub fn decode(&self, raw: &str) -> Option<LifecycleState> {
        self.names
            .iter()
            .find(|(_, name)| *name == raw)
            .map(|(state, _)| *state)
    }
}

impl Default for StateVocabulary {
    fn default() -> Self {
        Self::CANONICAL
    }
}
