//! Bounded engine calls.

use std::future::Future;
use std::time::Duration;

use monitor_core::{EngineError, MonitorError};

/// Await an engine call, turning an elapsed `timeout` into [`EngineError::Unavailable`].
///
/// Engine calls are never retried here; a monitoring read fails fast.
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Unavailable(format!(
            "engine did not answer within {}ms",
            timeout.as_millis()
        ))),
    }
}

/// [`bounded`] for queue-level calls, mapped into the monitor's error taxonomy.
pub(crate) async fn queue_call<T>(
    queue: &str,
    timeout: Duration,
    call: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, MonitorError> {
    bounded(timeout, call)
        .await
        .map_err(|e| MonitorError::from_engine(queue, e))
}

/// [`bounded`] for calls addressing a single item.
pub(crate) async fn item_call<T>(
    queue: &str,
    id: &str,
    timeout: Duration,
    call: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, MonitorError> {
    bounded(timeout, call)
        .await
        .map_err(|e| MonitorError::from_item_engine(queue, id, e))
}
