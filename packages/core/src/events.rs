//! Change notifications flowing into and out of the monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateCounts, ItemId};

/// Upstream signal from an engine that something in a queue changed.
///
/// Carries no state: receivers re-read whatever they need. Delivery may be
/// duplicated or out of order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanged {
    /// Queue the change happened in.
    pub queue: String,
    /// Item affected, when the change concerned a single item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    /// When the engine observed the change.
    pub timestamp: DateTime<Utc>,
}

impl ItemChanged {
    pub fn item(queue: impl Into<String>, item_id: ItemId) -> Self {
        Self {
            queue: queue.into(),
            item_id: Some(item_id),
            timestamp: Utc::now(),
        }
    }

    pub fn queue(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            item_id: None,
            timestamp: Utc::now(),
        }
    }
}

/// Events pushed to subscribed connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A queue's state changed; carries a fresh full counts snapshot.
    CountsChanged {
        queue: String,
        counts: AggregateCounts,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Get the queue this event concerns.
    pub fn queue(&self) -> &str {
        match self {
            MonitorEvent::CountsChanged { queue, .. } => queue,
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MonitorEvent::CountsChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::CountsChanged { queue, counts, .. } => {
                format!("Queue '{}' counts changed ({} items)", queue, counts.total())
            }
        }
    }
}
