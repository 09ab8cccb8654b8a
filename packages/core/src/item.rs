//! Work item types as seen by the monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::LifecycleState;

/// Opaque identifier of an item, unique within its queue and assigned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A work item held by a queue engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Engine-assigned identifier.
    pub id: ItemId,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Reported progress in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// When the item was added.
    pub created_at: DateTime<Utc>,
    /// When processing began.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the item reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Why the item failed. Only present in the failed state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Opaque engine options.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Opaque trace captured on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_info: Option<serde_json::Value>,
}

impl Item {
    /// Create a waiting item created now.
    pub fn new(id: impl Into<ItemId>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            state: LifecycleState::Waiting,
            progress: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            failure_reason: None,
            payload,
            options: serde_json::Value::Object(Default::default()),
            trace_info: None,
        }
    }

    /// Set the lifecycle state.
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set the engine options.
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    /// Mark the item failed with the given reason.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        self.state = LifecycleState::Failed;
        self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
        self.failure_reason = Some(reason.into());
        self
    }

    /// Most recent time the engine moved this item.
    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.finished_at
            .or(self.started_at)
            .unwrap_or(self.created_at)
    }
}
