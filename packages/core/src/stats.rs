//! Engine-level health figures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What an engine reports about itself, independent of any one queue's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Engine kind, e.g. `surrealdb`.
    pub engine: String,
    /// Engine version as the engine reports it.
    pub version: String,
    /// Named gauges; which ones are present depends on the engine.
    #[serde(default)]
    pub metrics: BTreeMap<String, u64>,
}

impl EngineStats {
    pub fn new(engine: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            version: version.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: u64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn metric(&self, name: &str) -> Option<u64> {
        self.metrics.get(name).copied()
    }
}
