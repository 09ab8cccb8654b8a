//! Job mutation service tests against the in-memory engine.

mod common;

use std::time::Duration;

use engine::EngineOp;
use monitor_core::{EngineError, ItemId, LifecycleState, MonitorError, PageRequest, StateFilter};
use services::{JobMutationService, MANUAL_FAIL_REASON, RemoveOutcome};

use common::{registry_with, seed};

#[tokio::test]
async fn test_remove_item() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("emails");
    let items = seed(&queue, LifecycleState::Waiting, 2);
    let service = JobMutationService::new(registry);

    let outcome = service.remove_item("emails", &items[0].id).await?;
    assert_eq!(outcome, RemoveOutcome::Removed);
    assert_eq!(queue.calls(EngineOp::ForceFail), 0);

    let again = service.remove_item("emails", &items[0].id).await;
    assert!(matches!(again, Err(MonitorError::ItemNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn test_remove_active_item_falls_back_to_failed() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("emails");
    let items = seed(&queue, LifecycleState::Active, 1);
    let service = JobMutationService::new(registry.clone());

    let outcome = service.remove_item("emails", &items[0].id).await?;
    assert!(matches!(outcome, RemoveOutcome::ForcedFailed { .. }));
    assert!(!outcome.is_removed());

    let query = services::JobQueryService::new(registry);
    let item = query.get_item("emails", &items[0].id).await?;
    assert_eq!(item.state, LifecycleState::Failed);
    assert_eq!(item.failure_reason.as_deref(), Some(MANUAL_FAIL_REASON));
    Ok(())
}

#[tokio::test]
async fn test_remove_reports_partial_failure() {
    let (registry, queue) = registry_with("emails");
    let items = seed(&queue, LifecycleState::Waiting, 1);
    queue.fail_with(EngineOp::Remove, EngineError::Rejected("locked".to_string()));
    queue.fail_with(
        EngineOp::ForceFail,
        EngineError::Unavailable("gone".to_string()),
    );
    let service = JobMutationService::new(registry);

    let result = service.remove_item("emails", &items[0].id).await;
    match result {
        Err(MonitorError::PartialFailure { removal, fallback }) => {
            assert!(removal.contains("locked"));
            assert!(fallback.contains("gone"));
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
    assert_eq!(queue.calls(EngineOp::Remove), 1);
    assert_eq!(queue.calls(EngineOp::ForceFail), 1);
}

#[tokio::test]
async fn test_remove_vanished_item_is_not_compensated() {
    let (registry, queue) = registry_with("emails");
    let items = seed(&queue, LifecycleState::Waiting, 1);
    queue.fail_with(EngineOp::Remove, EngineError::NotFound("raced".to_string()));
    let service = JobMutationService::new(registry);

    let result = service.remove_item("emails", &items[0].id).await;
    assert!(matches!(result, Err(MonitorError::ItemNotFound { .. })));
    assert_eq!(queue.calls(EngineOp::ForceFail), 0);
}

#[tokio::test]
async fn test_retry_failed_item() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("emails");
    let items = seed(&queue, LifecycleState::Failed, 1);
    let service = JobMutationService::new(registry);

    service.retry_item("emails", &items[0].id).await?;
    assert_eq!(queue.calls(EngineOp::Retry), 1);
    Ok(())
}

#[tokio::test]
async fn test_retry_non_failed_item_is_invalid_state() {
    let (registry, queue) = registry_with("emails");
    let items = seed(&queue, LifecycleState::Waiting, 1);
    let service = JobMutationService::new(registry);

    let result = service.retry_item("emails", &items[0].id).await;
    assert!(matches!(result, Err(MonitorError::InvalidState(_))));
    assert_eq!(queue.calls(EngineOp::Retry), 0);

    let missing = service.retry_item("emails", &ItemId::from("nope")).await;
    assert!(matches!(missing, Err(MonitorError::ItemNotFound { .. })));
    assert_eq!(queue.calls(EngineOp::Retry), 0);
}

#[tokio::test]
async fn test_bulk_clear_respects_grace() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("emails");
    seed(&queue, LifecycleState::Waiting, 3);
    seed(&queue, LifecycleState::Failed, 1);
    let fresh = queue.add(serde_json::json!({ "fresh": true }));
    let service = JobMutationService::new(registry.clone());

    let removed = service
        .bulk_clear("emails", StateFilter::State(LifecycleState::Waiting))
        .await?;
    assert_eq!(removed, 3);

    let query = services::JobQueryService::new(registry);
    let counts = query.counts("emails").await?;
    assert_eq!(counts.get(LifecycleState::Waiting), 1);
    assert_eq!(counts.get(LifecycleState::Failed), 1);
    assert_eq!(query.get_item("emails", &fresh.id).await?.id, fresh.id);

    let waiting = query
        .list_items(&PageRequest::new("emails").with_filter(LifecycleState::Waiting))
        .await?;
    assert_eq!(waiting.total_count, 1);
    let listed: Vec<&ItemId> = waiting.items.iter().map(|item| &item.id).collect();
    assert_eq!(listed, vec![&fresh.id]);
    Ok(())
}

#[tokio::test]
async fn test_bulk_clear_needs_a_state() {
    let (registry, queue) = registry_with("emails");
    let service = JobMutationService::new(registry);

    let result = service.bulk_clear("emails", StateFilter::Latest).await;
    assert!(matches!(result, Err(MonitorError::InvalidRequest(_))));
    assert_eq!(queue.calls(EngineOp::CleanOlderThan), 0);
}

#[tokio::test]
async fn test_bulk_clear_with_zero_grace() -> Result<(), Box<dyn std::error::Error>> {
    let (registry, queue) = registry_with("emails");
    queue.add(serde_json::json!({}));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let service = JobMutationService::new(registry).with_clean_grace(Duration::ZERO);

    let removed = service
        .bulk_clear("emails", StateFilter::State(LifecycleState::Waiting))
        .await?;
    assert_eq!(removed, 1);
    Ok(())
}
