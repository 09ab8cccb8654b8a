//! Error taxonomy shared by every layer of the monitor.

use thiserror::Error;

/// Failure reported by a queue engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine could not be reached or did not answer in time.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The addressed item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the monitor's query, mutation and notification paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("item {id} not found in queue {queue}")]
    ItemNotFound { queue: String, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine error: {0}")]
    Engine(String),

    /// Removal failed and the compensating force-fail failed too.
    #[error("removal failed ({removal}); fallback to failed state also failed ({fallback})")]
    PartialFailure { removal: String, fallback: String },

    #[error("notification hub unavailable: {0}")]
    Hub(String),
}

impl MonitorError {
    /// Whether the caller is at fault (reported as a client error, never retried).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MonitorError::QueueNotFound(_)
                | MonitorError::ItemNotFound { .. }
                | MonitorError::InvalidState(_)
                | MonitorError::InvalidRequest(_)
        )
    }

    /// Map an engine failure on a queue-level call.
    pub fn from_engine(queue: &str, error: EngineError) -> Self {
        match error {
            EngineError::Unavailable(msg) => MonitorError::Unavailable(msg),
            EngineError::NotFound(_) => MonitorError::QueueNotFound(queue.to_string()),
            EngineError::Rejected(msg) => MonitorError::Engine(msg),
        }
    }

    /// Map an engine failure on a call addressing a single item.
    pub fn from_item_engine(queue: &str, id: &str, error: EngineError) -> Self {
        match error {
            EngineError::NotFound(_) => MonitorError::ItemNotFound {
                queue: queue.to_string(),
                id: id.to_string(),
            },
            other => Self::from_engine(queue, other),
        }
    }
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
