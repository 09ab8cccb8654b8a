//! Startup for the queue monitor.

use std::sync::Arc;

use engine::{DbError, SurrealQueue};
use services::QueueRegistry;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{ConfigError, MonitorConfig};
use crate::monitor::Monitor;

/// Initialization errors.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("failed to start notification hub: {0}")]
    Hub(String),
}

/// A monitor over SurrealDB-backed queues.
pub struct MonitorRuntime {
    pub monitor: Monitor,
    /// Producer-side handles, one per configured queue.
    pub queues: Vec<Arc<SurrealQueue>>,
    /// Completes when the notification hub stops.
    pub hub_handle: JoinHandle<()>,
}

/// Initialize the queue monitor.
///
/// This should be called once at startup before handling requests.
pub async fn init_monitor(config: MonitorConfig) -> Result<MonitorRuntime, InitError> {
    tracing::info!("Initializing queue monitor...");
    config.validate()?;

    let db = engine::init(&config.db).await?;

    let registry = Arc::new(QueueRegistry::new());
    let mut queues = Vec::with_capacity(config.queues.len());
    for name in &config.queues {
        let queue = Arc::new(SurrealQueue::new(db.clone(), name.as_str()));
        registry.register(name.as_str(), queue.clone());
        queues.push(queue);
    }

    let (monitor, hub_handle) = Monitor::start(registry, &config).await?;

    tracing::info!("Queue monitor initialized with {} queues", queues.len());
    Ok(MonitorRuntime {
        monitor,
        queues,
        hub_handle,
    })
}
