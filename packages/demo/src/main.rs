//! Runs the monitor over in-memory SurrealDB queues while a simulated
//! worker churns through items, printing every pushed update as an SSE frame.

use std::time::Duration;

use api::{ListItemsQuery, MonitorConfig, format_sse_event, init_monitor};
use monitor_core::LifecycleState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = MonitorConfig::from_env()?;
    if config.queues == ["default"] {
        config = config.with_queues(["emails", "reports"]);
    }
    let runtime = init_monitor(config).await?;
    let monitor = runtime.monitor.clone();

    let mut connection = monitor.connect()?;
    for queue in monitor.list_queues() {
        let counts = connection.subscribe(&queue).await?;
        tracing::info!("Subscribed to {} ({} items)", queue, counts.total());
    }

    let printer = tokio::spawn(async move {
        while let Some(event) = connection.recv().await {
            print!("{}", format_sse_event(&event));
        }
    });

    // Simulated producer and worker.
    for queue in &runtime.queues {
        for n in 0..12u64 {
            let item = queue
                .add(serde_json::json!({ "n": n }), serde_json::json!({ "attempts": 3 }))
                .await?;
            queue.transition(&item.id, LifecycleState::Active).await?;
            queue.update_progress(&item.id, 50).await?;
            let outcome = if n % 4 == 0 {
                LifecycleState::Failed
            } else {
                LifecycleState::Completed
            };
            queue.transition(&item.id, outcome).await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    let failed = ListItemsQuery {
        filter: Some("failed".to_string()),
        ..Default::default()
    };
    let page = monitor.list_items("emails", failed).await?;
    tracing::info!("emails has {} failed items", page.total_count);
    if let Some(item) = page.items.first() {
        monitor.retry_item("emails", item.id.as_str()).await?;
        tracing::info!("Retried {}", item.id);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    let cleared = monitor.bulk_clear("reports", "completed").await?;
    tracing::info!("Cleared {} completed items from reports", cleared);

    for summary in monitor.overview().await {
        match summary.counts {
            Ok(counts) => tracing::info!("{}: {} items", summary.name, counts.total()),
            Err(e) => tracing::warn!("{}: {}", summary.name, e),
        }
    }

    monitor.shutdown();
    printer.await?;
    Ok(())
}
