#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use engine::MemoryQueue;
use monitor_core::{Item, LifecycleState};
use services::QueueRegistry;

/// Register a fresh in-memory queue and return both handles.
pub fn registry_with(name: &str) -> (Arc<QueueRegistry>, Arc<MemoryQueue>) {
    let registry = Arc::new(QueueRegistry::new());
    let queue = Arc::new(MemoryQueue::new(name));
    registry.register(name, queue.clone());
    (registry, queue)
}

/// Insert `count` items in `state`, created a minute apart and all older than a minute.
pub fn seed(queue: &MemoryQueue, state: LifecycleState, count: u64) -> Vec<Item> {
    (0..count)
        .map(|i| {
            let created = Utc::now() - chrono::Duration::seconds(3600 - i as i64 * 60);
            let mut item = Item::new(
                format!("{}-{}", state, i),
                serde_json::json!({ "n": i }),
            )
            .with_created_at(created);
            item = match state {
                LifecycleState::Failed => item.failed("boom"),
                other => item.with_state(other),
            };
            item.finished_at = item.finished_at.map(|_| created);
            item.started_at = item.started_at.map(|_| created);
            queue.insert(item)
        })
        .collect()
}
