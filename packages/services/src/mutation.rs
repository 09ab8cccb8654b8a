//! Write side of the monitor: remove, retry and bulk clean.

use std::sync::Arc;
use std::time::Duration;

use monitor_core::{EngineError, ItemId, LifecycleState, MonitorError, MonitorResult, StateFilter};
use serde::{Deserialize, Serialize};

use crate::call::{bounded, item_call, queue_call};
use crate::registry::QueueRegistry;

/// Reason recorded on an item that could not be removed and was failed instead.
pub const MANUAL_FAIL_REASON: &str = "Manually failed";

/// How a removal ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemoveOutcome {
    /// The item is gone.
    Removed,
    /// Removal failed; the item was moved to the failed state instead.
    ForcedFailed { removal_error: String },
}

impl RemoveOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, RemoveOutcome::Removed)
    }
}

/// Applies operator mutations to registered queues.
///
/// Mutations emit no notifications; observers see their effect through the
/// engine's own change events.
#[derive(Clone)]
pub struct JobMutationService {
    registry: Arc<QueueRegistry>,
    timeout: Duration,
    grace: Duration,
}

impl JobMutationService {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Items younger than this survive a bulk clean.
    pub const DEFAULT_CLEAN_GRACE: Duration = Duration::from_millis(5000);

    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self {
            registry,
            timeout: Self::DEFAULT_TIMEOUT,
            grace: Self::DEFAULT_CLEAN_GRACE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clean_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Remove an item, falling back to failing it when removal is refused.
    pub async fn remove_item(&self, queue: &str, id: &ItemId) -> MonitorResult<RemoveOutcome> {
        let engine = self.registry.lookup(queue)?;
        item_call(queue, id.as_str(), self.timeout, engine.get_item(id))
            .await?
            .ok_or_else(|| item_not_found(queue, id))?;

        let removal = match bounded(self.timeout, engine.remove(id)).await {
            Ok(()) => {
                tracing::debug!("Removed item {} from queue {}", id, queue);
                return Ok(RemoveOutcome::Removed);
            }
            Err(EngineError::NotFound(_)) => return Err(item_not_found(queue, id)),
            Err(e) => e,
        };

        tracing::warn!(
            "Failed to remove item {} from queue {}, failing it instead: {}",
            id,
            queue,
            removal
        );

        match bounded(self.timeout, engine.force_fail(id, MANUAL_FAIL_REASON)).await {
            Ok(()) => Ok(RemoveOutcome::ForcedFailed {
                removal_error: removal.to_string(),
            }),
            Err(fallback) => {
                tracing::error!(
                    "Fallback failed for item {} in queue {}: {}",
                    id,
                    queue,
                    fallback
                );
                Err(MonitorError::PartialFailure {
                    removal: removal.to_string(),
                    fallback: fallback.to_string(),
                })
            }
        }
    }

    /// Move a failed item back to waiting.
    pub async fn retry_item(&self, queue: &str, id: &ItemId) -> MonitorResult<()> {
        let engine = self.registry.lookup(queue)?;
        let item = item_call(queue, id.as_str(), self.timeout, engine.get_item(id))
            .await?
            .ok_or_else(|| item_not_found(queue, id))?;

        if item.state != LifecycleState::Failed {
            return Err(MonitorError::InvalidState(format!(
                "item {} is {}, only failed items can be retried",
                id, item.state
            )));
        }

        item_call(queue, id.as_str(), self.timeout, engine.retry(id)).await?;
        tracing::debug!("Retried item {} in queue {}", id, queue);
        Ok(())
    }

    /// Remove every item in `filter`'s state older than the grace period.
    ///
    /// Returns the number of removed items.
    pub async fn bulk_clear(&self, queue: &str, filter: StateFilter) -> MonitorResult<u64> {
        let state = filter.state().ok_or_else(|| {
            MonitorError::InvalidRequest("bulk clear needs a concrete state".to_string())
        })?;
        let engine = self.registry.lookup(queue)?;
        let removed = queue_call(
            queue,
            self.timeout,
            engine.clean_older_than(state, self.grace),
        )
        .await?;
        tracing::info!("Cleared {} {} items from queue {}", removed, state, queue);
        Ok(removed)
    }
}

fn item_not_found(queue: &str, id: &ItemId) -> MonitorError {
    MonitorError::ItemNotFound {
        queue: queue.to_string(),
        id: id.to_string(),
    }
}
