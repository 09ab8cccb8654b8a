#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::time::Duration;

use engine::{QueueEngine, StateVocabulary, SurrealQueue};
use monitor_core::{EngineError, Item, ItemId, LifecycleState, StateFilter};

use common::{ago, payload_with_message, setup_db};

#[tokio::test]
async fn test_counts_and_paging() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let emails = SurrealQueue::new(db.clone(), "emails");
    let other = SurrealQueue::new(db, "other");

    for i in 0..5 {
        let item = Item::new(format!("w{i}"), payload_with_message("wait"))
            .with_created_at(ago(Duration::from_secs(60 - i)));
        emails.insert(&item).await?;
    }
    emails.insert(&Item::new("f1", payload_with_message("boom")).failed("boom")).await?;
    emails.insert(&Item::new("f2", payload_with_message("bang")).failed("bang")).await?;
    other.add(payload_with_message("elsewhere"), serde_json::json!({})).await?;

    let counts = emails.counts_by_state().await?;
    assert_eq!(counts.get(LifecycleState::Waiting), 5);
    assert_eq!(counts.get(LifecycleState::Failed), 2);
    assert_eq!(counts.get(LifecycleState::Active), 0);
    assert_eq!(counts.total(), 7);

    let failed = emails
        .get_items(StateFilter::State(LifecycleState::Failed), 0, 10)
        .await?;
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|i| i.state == LifecycleState::Failed));
    assert!(failed.iter().all(|i| i.failure_reason.is_some()));

    // Waiting items come back newest first: w4 was created last.
    let waiting = emails
        .get_items(StateFilter::State(LifecycleState::Waiting), 0, 2)
        .await?;
    let ids: Vec<&str> = waiting.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["w4", "w3"]);

    let second_page = emails
        .get_items(StateFilter::State(LifecycleState::Waiting), 2, 4)
        .await?;
    let ids: Vec<&str> = second_page.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["w2", "w1"]);

    let latest = emails.get_items(StateFilter::Latest, 0, 100).await?;
    assert_eq!(latest.len(), 7);

    let empty = emails.get_items(StateFilter::Latest, 5, 5).await?;
    assert!(empty.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_lifecycle_operations() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let queue = SurrealQueue::new(db, "jobs");

    let item = queue
        .add(payload_with_message("hi"), serde_json::json!({ "attempts": 3 }))
        .await?;
    let loaded = queue.get_item(&item.id).await?.ok_or("item missing")?;
    assert_eq!(loaded.state, LifecycleState::Waiting);
    assert_eq!(loaded.payload, payload_with_message("hi"));
    assert_eq!(loaded.options["attempts"], 3);

    // Active items are locked and cannot be removed, but can be forced to failed.
    let running = queue.transition(&item.id, LifecycleState::Active).await?;
    assert!(running.started_at.is_some());
    queue.update_progress(&item.id, 40).await?;
    let removal = queue.remove(&item.id).await;
    assert!(matches!(removal, Err(EngineError::Rejected(_))));

    queue.force_fail(&item.id, "Manually failed").await?;
    let failed = queue.get_item(&item.id).await?.ok_or("item missing")?;
    assert_eq!(failed.state, LifecycleState::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("Manually failed"));
    assert!(failed.finished_at.is_some());

    queue.retry(&item.id).await?;
    let retried = queue.get_item(&item.id).await?.ok_or("item missing")?;
    assert_eq!(retried.state, LifecycleState::Waiting);
    assert!(retried.failure_reason.is_none());
    assert!(retried.progress.is_none());

    // Only failed items can be retried.
    let again = queue.retry(&item.id).await;
    assert!(matches!(again, Err(EngineError::Rejected(_))));

    queue.remove(&item.id).await?;
    assert!(queue.get_item(&item.id).await?.is_none());

    let missing = queue.remove(&ItemId::from("nope")).await;
    assert!(matches!(missing, Err(EngineError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_clean_respects_grace_window() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let queue = SurrealQueue::new(db, "clean");

    let old = Item::new("old", payload_with_message("old"))
        .with_created_at(ago(Duration::from_secs(60)));
    queue.insert(&old).await?;
    let fresh = queue.add(payload_with_message("fresh"), serde_json::json!({})).await?;
    let old_failed = Item::new("old-failed", payload_with_message("x"))
        .with_created_at(ago(Duration::from_secs(60)))
        .failed("x");
    queue.insert(&old_failed).await?;

    let removed = queue
        .clean_older_than(LifecycleState::Waiting, Duration::from_secs(5))
        .await?;
    assert_eq!(removed, 1);

    assert!(queue.get_item(&ItemId::from("old")).await?.is_none());
    assert!(queue.get_item(&fresh.id).await?.is_some());

    let counts = queue.counts_by_state().await?;
    assert_eq!(counts.get(LifecycleState::Waiting), 1);
    assert_eq!(counts.get(LifecycleState::Failed), 1);

    Ok(())
}

#[tokio::test]
async fn test_changes_are_published() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let queue = SurrealQueue::new(db, "events");
    let mut changes = queue.watch();

    let item = queue.add(payload_with_message("a"), serde_json::json!({})).await?;
    let event = changes.recv().await?;
    assert_eq!(event.queue, "events");
    assert_eq!(event.item_id, Some(item.id.clone()));

    queue.transition(&item.id, LifecycleState::Completed).await?;
    let event = changes.recv().await?;
    assert_eq!(event.item_id, Some(item.id));

    Ok(())
}

#[tokio::test]
async fn test_vocabulary_controls_stored_status() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let queue = SurrealQueue::new(db.clone(), "vocab");
    queue.add(payload_with_message("a"), serde_json::json!({})).await?;

    let mut response = db
        .query("SELECT status FROM item WHERE queue = $queue")
        .bind(("queue", "vocab".to_string()))
        .await?;
    let rows: Vec<serde_json::Value> = response.take(0)?;
    assert_eq!(rows[0]["status"], "pending");

    let canonical =
        SurrealQueue::new(db, "vocab-canonical").with_vocabulary(StateVocabulary::CANONICAL);
    canonical.add(payload_with_message("b"), serde_json::json!({})).await?;
    let counts = canonical.counts_by_state().await?;
    assert_eq!(counts.get(LifecycleState::Waiting), 1);

    Ok(())
}

#[tokio::test]
async fn test_clean_skips_item_refreshed_since_it_aged() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let queue = SurrealQueue::new(db, "refresh");

    let mut stale = Item::new("stale", payload_with_message("x"))
        .with_created_at(ago(Duration::from_secs(60)))
        .failed("first attempt");
    stale.started_at = Some(ago(Duration::from_secs(60)));
    stale.finished_at = Some(ago(Duration::from_secs(60)));
    queue.insert(&stale).await?;

    // A worker retries it and it fails again: same state, fresh timestamp.
    queue.retry(&stale.id).await?;
    queue.transition(&stale.id, LifecycleState::Failed).await?;

    let removed = queue
        .clean_older_than(LifecycleState::Failed, Duration::from_secs(5))
        .await?;
    assert_eq!(removed, 0);
    assert!(queue.get_item(&stale.id).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn test_remove_refuses_item_a_worker_picked_up() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let monitor_side = SurrealQueue::new(db.clone(), "claimed");
    let worker_side = SurrealQueue::new(db, "claimed");

    let item = monitor_side
        .add(payload_with_message("job"), serde_json::json!({}))
        .await?;
    worker_side
        .transition(&item.id, LifecycleState::Active)
        .await?;

    let removal = monitor_side.remove(&item.id).await;
    assert!(matches!(removal, Err(EngineError::Rejected(_))));
    let kept = monitor_side.get_item(&item.id).await?.ok_or("item missing")?;
    assert_eq!(kept.state, LifecycleState::Active);

    Ok(())
}

#[tokio::test]
async fn test_out_of_range_timestamp_is_an_error() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let queue = SurrealQueue::new(db.clone(), "corrupt");

    db.query("CREATE item CONTENT $content RETURN NONE")
        .bind((
            "content",
            serde_json::json!({
                "item_id": "broken",
                "queue": "corrupt",
                "status": "pending",
                "created_at": i64::MAX,
                "updated_at": i64::MAX,
                "payload": {},
                "options": {},
            }),
        ))
        .await?
        .check()?;

    let result = queue.get_item(&ItemId::from("broken")).await;
    match result {
        Err(EngineError::Unavailable(message)) => assert!(message.contains("timestamp")),
        other => panic!("expected a serialization failure, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_stats_report_engine_and_store() -> Result<(), Box<dyn Error>> {
    let db = setup_db().await?;
    let emails = SurrealQueue::new(db.clone(), "emails");
    let reports = SurrealQueue::new(db, "reports");
    emails.add(payload_with_message("a"), serde_json::json!({})).await?;
    emails.add(payload_with_message("b"), serde_json::json!({})).await?;
    reports.add(payload_with_message("c"), serde_json::json!({})).await?;
    let _watcher = emails.watch();

    let stats = emails.stats().await?;
    assert_eq!(stats.engine, "surrealdb");
    assert!(!stats.version.is_empty());
    assert_eq!(stats.metric("stored_items"), Some(3));
    assert_eq!(stats.metric("queues"), Some(2));
    assert_eq!(stats.metric("watchers"), Some(1));

    Ok(())
}
