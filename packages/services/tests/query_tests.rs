//! Job query service tests against the in-memory engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use engine::{EngineOp, MemoryQueue};
use monitor_core::{EngineError, ItemId, LifecycleState, MonitorError, PageRequest, StateFilter};
use services::{JobQueryService, QueueRegistry};

use common::{registry_with, seed};

#[tokio::test]
async fn test_stale_page_clamps_to_last_page() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("emails");
    seed(&queue, LifecycleState::Waiting, 5);
    let failed = seed(&queue, LifecycleState::Failed, 2);
    let service = JobQueryService::new(registry);

    let request = PageRequest::new("emails")
        .with_filter(LifecycleState::Failed)
        .with_page(3)
        .with_page_size(10);
    let page = service.list_items(&request).await?;

    assert_eq!(page.page, 0);
    assert!(page.was_clamped(3));
    assert_eq!(page.total_count, 2);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|i| i.state == LifecycleState::Failed));
    // Most recent first.
    assert_eq!(page.items[0].id, failed[1].id);
    assert_eq!(page.counts.get(LifecycleState::Waiting), 5);
    assert_eq!(page.counts.get(LifecycleState::Failed), 2);
    Ok(())
}

#[tokio::test]
async fn test_served_page_never_exceeds_floor_bound() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("bound");
    seed(&queue, LifecycleState::Completed, 20);
    let service = JobQueryService::new(registry);

    for page_size in [1u64, 3, 7, 10, 20, 25] {
        for requested in 0..30u64 {
            let request = PageRequest::new("bound")
                .with_filter(LifecycleState::Completed)
                .with_page(requested)
                .with_page_size(page_size);
            let page = service.list_items(&request).await?;
            assert!(page.page <= page.total_count / page_size);
            assert!(page.page <= requested);
            assert!(!page.items.is_empty(), "page {} of size {page_size} is empty", page.page);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_exact_multiple_serves_full_last_page() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("exact");
    seed(&queue, LifecycleState::Waiting, 20);
    let service = JobQueryService::new(registry);

    let page = service
        .list_items(&PageRequest::new("exact").with_page(2).with_page_size(10))
        .await?;
    assert_eq!(page.page, 1);
    assert_eq!(page.items.len(), 10);
    Ok(())
}

#[tokio::test]
async fn test_latest_spans_every_state() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("mixed");
    seed(&queue, LifecycleState::Waiting, 3);
    seed(&queue, LifecycleState::Active, 2);
    seed(&queue, LifecycleState::Delayed, 1);
    let service = JobQueryService::new(registry);

    let page = service
        .list_items(&PageRequest::new("mixed").with_filter(StateFilter::Latest))
        .await?;
    assert_eq!(page.total_count, 6);
    assert_eq!(page.items.len(), 6);
    let created: Vec<_> = page.items.iter().map(|i| i.created_at).collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]));
    Ok(())
}

#[tokio::test]
async fn test_empty_queue_serves_page_zero() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, _queue) = registry_with("empty");
    let service = JobQueryService::new(registry);

    let page = service
        .list_items(&PageRequest::new("empty").with_page(4))
        .await?;
    assert_eq!(page.page, 0);
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_page_size_is_rejected() {
    let (registry, queue) = registry_with("sizes");
    let service = JobQueryService::new(registry).with_max_page_size(50);

    let zero = service
        .list_items(&PageRequest::new("sizes").with_page_size(0))
        .await;
    assert!(matches!(zero, Err(MonitorError::InvalidRequest(_))));

    let huge = service
        .list_items(&PageRequest::new("sizes").with_page_size(51))
        .await;
    assert!(matches!(huge, Err(MonitorError::InvalidRequest(_))));
    assert_eq!(queue.calls(EngineOp::CountsByState), 0);
}

#[tokio::test]
async fn test_unknown_queue() {
    let service = JobQueryService::new(Arc::new(QueueRegistry::new()));

    let result = service.list_items(&PageRequest::new("nope")).await;
    assert_eq!(result, Err(MonitorError::QueueNotFound("nope".to_string())));
    assert!(matches!(
        service.counts("nope").await,
        Err(MonitorError::QueueNotFound(_))
    ));
}

#[tokio::test]
async fn test_engine_failure_is_unavailable() {
    let (registry, queue) = registry_with("flaky");
    queue.fail_with(
        EngineOp::CountsByState,
        EngineError::Unavailable("connection refused".to_string()),
    );
    let service = JobQueryService::new(registry);

    let result = service.list_items(&PageRequest::new("flaky")).await;
    assert!(matches!(result, Err(MonitorError::Unavailable(_))));
    // Fails fast without retrying.
    assert_eq!(queue.calls(EngineOp::CountsByState), 1);
    assert_eq!(queue.calls(EngineOp::GetItems), 0);
}

#[tokio::test]
async fn test_slow_engine_times_out() {
    let (registry, queue) = registry_with("slow");
    queue.set_latency(Some(Duration::from_millis(500)));
    let service = JobQueryService::new(registry).with_timeout(Duration::from_millis(50));

    let result = service.counts("slow").await;
    assert!(matches!(result, Err(MonitorError::Unavailable(_))));
}

#[tokio::test]
async fn test_get_item() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("detail");
    let item = queue.insert(
        monitor_core::Item::new("job-1", serde_json::json!({ "to": "a@b.c" })).failed("smtp down"),
    );
    let service = JobQueryService::new(registry);

    let found = service.get_item("detail", &item.id).await?;
    assert_eq!(found.failure_reason.as_deref(), Some("smtp down"));

    let missing = service.get_item("detail", &ItemId::from("job-2")).await;
    assert!(matches!(missing, Err(MonitorError::ItemNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn test_overview_reports_each_queue() {
    let registry = Arc::new(QueueRegistry::new());
    let emails = Arc::new(MemoryQueue::new("emails"));
    let reports = Arc::new(MemoryQueue::new("reports"));
    registry.register("reports", reports.clone());
    registry.register("emails", emails.clone());
    seed(&emails, LifecycleState::Waiting, 2);
    reports.fail_with(
        EngineOp::CountsByState,
        EngineError::Unavailable("down".to_string()),
    );
    let service = JobQueryService::new(registry);

    assert_eq!(service.list_queues(), vec!["emails", "reports"]);

    let overview = service.overview().await;
    assert_eq!(overview.len(), 2);
    assert_eq!(overview[0].name, "emails");
    assert_eq!(
        overview[0].counts.as_ref().map(|c| c.get(LifecycleState::Waiting)),
        Ok(2)
    );
    assert!(matches!(overview[1].counts, Err(MonitorError::Unavailable(_))));
}

#[tokio::test]
async fn test_stats_pass_through() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("stats");
    seed(&queue, LifecycleState::Waiting, 3);
    let service = JobQueryService::new(registry);

    let stats = service.stats("stats").await?;
    assert_eq!(stats.engine, "memory");
    assert_eq!(stats.metric("stored_items"), Some(3));

    queue.fail_with(EngineOp::Stats, EngineError::Unavailable("down".to_string()));
    assert!(matches!(
        service.stats("stats").await,
        Err(MonitorError::Unavailable(_))
    ));
    assert!(matches!(
        service.stats("nope").await,
        Err(MonitorError::QueueNotFound(_))
    ));
    Ok(())
}
