//! State transition rules shared by the bundled engines.

use chrono::{DateTime, Utc};
use monitor_core::{EngineError, Item, LifecycleState};

/// Move `item` into `state`, keeping its timestamps consistent.
pub(crate) fn apply(item: &mut Item, state: LifecycleState, now: DateTime<Utc>) {
    match state {
        LifecycleState::Waiting | LifecycleState::Delayed | LifecycleState::Paused => {
            item.started_at = None;
            item.finished_at = None;
            item.progress = None;
        }
        LifecycleState::Active => {
            item.started_at.get_or_insert(now);
            item.finished_at = None;
        }
        LifecycleState::Completed | LifecycleState::Failed => {
            item.started_at.get_or_insert(now);
            item.finished_at = Some(now);
        }
    }
    if state != LifecycleState::Failed {
        item.failure_reason = None;
        item.trace_info = None;
    }
    item.state = state;
}

/// Fail `item` with `reason`, whatever state it is in.
pub(crate) fn fail(item: &mut Item, reason: &str, now: DateTime<Utc>) {
    apply(item, LifecycleState::Failed, now);
    item.failure_reason = Some(reason.to_string());
}

/// Active items are locked by their worker and cannot be removed.
pub(crate) fn ensure_removable(item: &Item) -> Result<(), EngineError> {
    if item.state == LifecycleState::Active {
        return Err(EngineError::Rejected(format!(
            "item {} is locked by an active worker",
            item.id
        )));
    }
    Ok(())
}

pub(crate) fn ensure_retryable(item: &Item) -> Result<(), EngineError> {
    if item.state != LifecycleState::Failed {
        return Err(EngineError::Rejected(format!(
            "item {} is {}, only failed items can be retried",
            item.id, item.state
        )));
    }
    Ok(())
}

pub(crate) fn not_found(queue: &str, id: &impl std::fmt::Display) -> EngineError {
    EngineError::NotFound(format!("item {} in queue {}", id, queue))
}
