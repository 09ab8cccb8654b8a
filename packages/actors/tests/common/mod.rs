#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actors::{HubSettings, NotificationHub};
use engine::MemoryQueue;
use monitor_core::{AggregateCounts, MonitorEvent};
use services::{JobQueryService, QueueRegistry};

pub struct Fixture {
    pub hub: NotificationHub,
    pub emails: Arc<MemoryQueue>,
    pub reports: Arc<MemoryQueue>,
}

/// Hub over two in-memory queues, `emails` and `reports`.
pub async fn start_hub(settings: HubSettings) -> Result<Fixture, Box<dyn std::error::Error>> {
    let registry = Arc::new(QueueRegistry::new());
    let emails = Arc::new(MemoryQueue::new("emails"));
    let reports = Arc::new(MemoryQueue::new("reports"));
    registry.register("emails", emails.clone());
    registry.register("reports", reports.clone());

    let query = JobQueryService::new(registry);
    let (hub, _handle) = NotificationHub::start(query, settings).await?;
    Ok(Fixture {
        hub,
        emails,
        reports,
    })
}

pub fn window(millis: u64) -> HubSettings {
    HubSettings::default().with_throttle(Duration::from_millis(millis))
}

/// Counts carried by an event.
pub fn counts_of(event: &MonitorEvent) -> &AggregateCounts {
    match event {
        MonitorEvent::CountsChanged { counts, .. } => counts,
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
