//! Registry mapping queue names to engine handles.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use engine::QueueEngine;
use monitor_core::MonitorError;

/// Queue registry shared by every component of the monitor.
///
/// Built once at startup and passed to each service. Late registration is
/// allowed and never races a concurrent lookup.
pub struct QueueRegistry {
    queues: RwLock<HashMap<String, Arc<dyn QueueEngine>>>,
}

impl QueueRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
        }
    }

    /// Register a queue under `name`, replacing any previous handle.
    pub fn register(&self, name: impl Into<String>, engine: Arc<dyn QueueEngine>) {
        let name = name.into();
        let replaced = self
            .queues
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), engine)
            .is_some();
        if replaced {
            tracing::info!("Replaced engine handle for queue: {}", name);
        } else {
            tracing::info!("Registered queue: {}", name);
        }
    }

    /// Register an engine under its own queue name.
    pub fn register_engine(&self, engine: Arc<dyn QueueEngine>) {
        let name = engine.name().to_string();
        self.register(name, engine);
    }

    /// Get the engine handle for a queue.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn QueueEngine>, MonitorError> {
        self.queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| MonitorError::QueueNotFound(name.to_string()))
    }

    /// Check if a queue is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// List all registered queue names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}
