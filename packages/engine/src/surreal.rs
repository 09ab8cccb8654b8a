//! SurrealDB-backed queue engine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_core::{
    AggregateCounts, EngineError, EngineStats, Item, ItemChanged, ItemId, LifecycleState,
    StateFilter,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::traits::{EngineFuture, QueueEngine};
use crate::{Database, DbError, StateVocabulary, lifecycle};

/// Columns read back for an item. Keeps the record id out of results.
const ITEM_FIELDS: &str = "item_id, queue, status, progress, created_at, updated_at, \
    started_at, finished_at, failed_reason, payload, options, stacktrace";

/// Capacity of the change-event channel per queue.
const EVENT_CAPACITY: usize = 1024;

/// Stored shape of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    item_id: String,
    queue: String,
    status: String,
    #[serde(default)]
    progress: Option<u8>,
    created_at: i64,
    updated_at: i64,
    #[serde(default)]
    started_at: Option<i64>,
    #[serde(default)]
    finished_at: Option<i64>,
    #[serde(default)]
    failed_reason: Option<String>,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    options: serde_json::Value,
    #[serde(default)]
    stacktrace: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StatusCount {
    status: String,
    count: i64,
}

#[derive(Debug, Deserialize)]
struct TotalRow {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct QueueRow {
    queue: String,
}

#[derive(Debug, Deserialize)]
struct KeyRow {
    item_id: String,
}

fn from_millis(item_id: &str, ms: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        DbError::Serialization(format!("item {} has out-of-range timestamp {}", item_id, ms))
    })
}

/// A named queue stored in SurrealDB.
///
/// Acts as the engine for the monitor and also exposes the producer side
/// (`add`, `transition`, `update_progress`) that workers use to move items.
/// Every change is published to [`QueueEngine::watch`] subscribers.
pub struct SurrealQueue {
    db: Database,
    name: String,
    vocabulary: StateVocabulary,
    events: broadcast::Sender<ItemChanged>,
}

impl SurrealQueue {
    /// Create a handle on queue `name`. The schema must already exist.
    pub fn new(db: Database, name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db,
            name: name.into(),
            vocabulary: StateVocabulary::SURREAL,
            events,
        }
    }

    /// Use a different state vocabulary for stored records.
    pub fn with_vocabulary(mut self, vocabulary: StateVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Enqueue a new waiting item with an engine-assigned id.
    pub async fn add(
        &self,
        payload: serde_json::Value,
        options: serde_json::Value,
    ) -> Result<Item, DbError> {
        let item = Item::new(Ulid::new().to_string(), payload).with_options(options);
        self.insert(&item).await
    }

    /// Store an item exactly as given, timestamps included.
    pub async fn insert(&self, item: &Item) -> Result<Item, DbError> {
        let record = self.to_record(item, item.last_transition_at());

        self.db
            .query("CREATE item CONTENT $content RETURN NONE")
            .bind(("content", record))
            .await?
            .check()?;

        tracing::debug!("Queue {} added item {}", self.name, item.id);
        self.publish(Some(item.id.clone()));
        Ok(item.clone())
    }

    /// Move an item into `state`, as a worker would.
    pub async fn transition(&self, id: &ItemId, state: LifecycleState) -> Result<Item, DbError> {
        let mut item = self.require(id).await?;
        lifecycle::apply(&mut item, state, Utc::now());
        self.store(&item).await?;
        self.publish(Some(id.clone()));
        Ok(item)
    }

    /// Record worker progress for an active item.
    pub async fn update_progress(&self, id: &ItemId, progress: u8) -> Result<Item, DbError> {
        let mut item = self.require(id).await?;
        item.progress = Some(progress.min(100));
        self.store(&item).await?;
        self.publish(Some(id.clone()));
        Ok(item)
    }

    fn publish(&self, item_id: Option<ItemId>) {
        let event = match item_id {
            Some(id) => ItemChanged::item(&self.name, id),
            None => ItemChanged::queue(&self.name),
        };
        // No receivers simply means nobody is watching.
        let _ = self.events.send(event);
    }

    fn to_record(&self, item: &Item, updated_at: DateTime<Utc>) -> ItemRecord {
        ItemRecord {
            item_id: item.id.to_string(),
            queue: self.name.clone(),
            status: self.vocabulary.encode(item.state).to_string(),
            progress: item.progress,
            created_at: item.created_at.timestamp_millis(),
            updated_at: updated_at.timestamp_millis(),
            started_at: item.started_at.map(|t| t.timestamp_millis()),
            finished_at: item.finished_at.map(|t| t.timestamp_millis()),
            failed_reason: item.failure_reason.clone(),
            payload: item.payload.clone(),
            options: item.options.clone(),
            stacktrace: item.trace_info.clone(),
        }
    }

    fn to_item(&self, record: ItemRecord) -> Result<Item, DbError> {
        let state = self.vocabulary.decode(&record.status).ok_or_else(|| {
            DbError::Serialization(format!(
                "item {} has unknown status '{}'",
                record.item_id, record.status
            ))
        })?;

        let at = |ms: i64| from_millis(&record.item_id, ms);
        let created_at = at(record.created_at)?;
        let started_at = record.started_at.map(at).transpose()?;
        let finished_at = record.finished_at.map(at).transpose()?;

        Ok(Item {
            id: ItemId(record.item_id),
            state,
            progress: record.progress,
            created_at,
            started_at,
            finished_at,
            failure_reason: record.failed_reason,
            payload: record.payload,
            options: record.options,
            trace_info: record.stacktrace,
        })
    }

    async fn fetch(&self, id: &ItemId) -> Result<Option<Item>, DbError> {
        let mut response = self
            .db
            .query(format!(
                "SELECT {ITEM_FIELDS} FROM item WHERE queue = $queue AND item_id = $item_id LIMIT 1"
            ))
            .bind(("queue", self.name.clone()))
            .bind(("item_id", id.to_string()))
            .await?;

        let records: Vec<ItemRecord> = response.take(0)?;

        records
            .into_iter()
            .next()
            .map(|record| self.to_item(record))
            .transpose()
    }

    async fn require(&self, id: &ItemId) -> Result<Item, DbError> {
        self.fetch(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("item {} in queue {}", id, self.name)))
    }

    /// Replace the stored content of an existing item.
    async fn store(&self, item: &Item) -> Result<(), DbError> {
        let record = self.to_record(item, Utc::now());

        let mut response = self
            .db
            .query(
                "UPDATE item CONTENT $content WHERE queue = $queue AND item_id = $item_id RETURN item_id",
            )
            .bind(("content", record))
            .bind(("queue", self.name.clone()))
            .bind(("item_id", item.id.to_string()))
            .await?;

        let updated: Vec<KeyRow> = response.take(0)?;
        if updated.is_empty() {
            return Err(DbError::NotFound(format!(
                "item {} in queue {}",
                item.id, self.name
            )));
        }
        Ok(())
    }

    async fn load_counts(&self) -> Result<AggregateCounts, DbError> {
        let mut response = self
            .db
            .query(
                r#"
                SELECT status, count() AS count
                FROM item
                WHERE queue = $queue
                GROUP BY status
                "#,
            )
            .bind(("queue", self.name.clone()))
            .await?;

        let rows: Vec<StatusCount> = response.take(0)?;

        let mut counts = AggregateCounts::new();
        for row in rows {
            match self.vocabulary.decode(&row.status) {
                Some(state) => counts.add(state, row.count.max(0) as u64),
                None => tracing::warn!(
                    "Queue {} has {} items with unknown status '{}'",
                    self.name,
                    row.count,
                    row.status
                ),
            }
        }
        Ok(counts)
    }

    async fn load_items(
        &self,
        filter: StateFilter,
        start: u64,
        end: u64,
    ) -> Result<Vec<Item>, DbError> {
        let limit = end.saturating_sub(start);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let status_clause = if filter.state().is_some() {
            "AND status = $status"
        } else {
            ""
        };
        let query = format!(
            "SELECT {ITEM_FIELDS} FROM item WHERE queue = $queue {status_clause} \
             ORDER BY created_at DESC, item_id DESC LIMIT $limit START $start"
        );

        let mut request = self
            .db
            .query(query)
            .bind(("queue", self.name.clone()))
            .bind(("limit", limit as i64))
            .bind(("start", start as i64));
        if let Some(state) = filter.state() {
            request = request.bind(("status", self.vocabulary.encode(state).to_string()));
        }

        let mut response = request.await?;
        let records: Vec<ItemRecord> = response.take(0)?;

        records.into_iter().map(|r| self.to_item(r)).collect()
    }

    async fn delete(&self, id: &ItemId) -> Result<(), EngineError> {
        // The lock check lives in the DELETE itself so an item that turns
        // active between our read and the write is never removed.
        let mut response = self
            .db
            .query(
                "DELETE item WHERE queue = $queue AND item_id = $item_id AND status != $active \
                 RETURN BEFORE",
            )
            .bind(("queue", self.name.clone()))
            .bind(("item_id", id.to_string()))
            .bind((
                "active",
                self.vocabulary.encode(LifecycleState::Active).to_string(),
            ))
            .await
            .map_err(DbError::from)?;
        let removed: Vec<KeyRow> = response.take(0).map_err(DbError::from)?;

        if removed.is_empty() {
            let item = self
                .fetch(id)
                .await?
                .ok_or_else(|| lifecycle::not_found(&self.name, id))?;
            lifecycle::ensure_removable(&item)?;
            return Err(EngineError::Rejected(format!(
                "item {} changed while being removed",
                id
            )));
        }

        self.publish(Some(id.clone()));
        Ok(())
    }

    async fn mark_failed(&self, id: &ItemId, reason: &str) -> Result<(), EngineError> {
        let mut item = self
            .fetch(id)
            .await?
            .ok_or_else(|| lifecycle::not_found(&self.name, id))?;
        lifecycle::fail(&mut item, reason, Utc::now());
        self.store(&item).await?;
        self.publish(Some(id.clone()));
        Ok(())
    }

    async fn requeue(&self, id: &ItemId) -> Result<(), EngineError> {
        let mut item = self
            .fetch(id)
            .await?
            .ok_or_else(|| lifecycle::not_found(&self.name, id))?;
        lifecycle::ensure_retryable(&item)?;
        lifecycle::apply(&mut item, LifecycleState::Waiting, Utc::now());
        self.store(&item).await?;
        self.publish(Some(id.clone()));
        Ok(())
    }

    async fn load_stats(&self) -> Result<EngineStats, DbError> {
        let version = self.db.version().await?;

        let mut response = self
            .db
            .query("SELECT count() AS count FROM item GROUP ALL")
            .query("SELECT queue FROM item GROUP BY queue")
            .await?;
        let totals: Vec<TotalRow> = response.take(0)?;
        let queues: Vec<QueueRow> = response.take(1)?;
        let stored_items = totals.first().map_or(0, |row| row.count.max(0) as u64);

        tracing::debug!(
            "Engine stats for {}: {} items across {} queues",
            self.name,
            stored_items,
            queues.len()
        );
        Ok(EngineStats::new("surrealdb", version.to_string())
            .with_metric("stored_items", stored_items)
            .with_metric("queues", queues.len() as u64)
            .with_metric("watchers", self.events.receiver_count() as u64))
    }

    async fn clean(&self, state: LifecycleState, age: Duration) -> Result<u64, DbError> {
        let age = chrono::Duration::from_std(age)
            .map_err(|e| DbError::Query(format!("invalid clean age: {}", e)))?;
        let cutoff = (Utc::now() - age).timestamp_millis();
        let status = self.vocabulary.encode(state).to_string();

        let mut response = self
            .db
            .query(
                "DELETE item WHERE queue = $queue AND status = $status AND updated_at < $cutoff \
                 RETURN BEFORE",
            )
            .bind(("queue", self.name.clone()))
            .bind(("status", status))
            .bind(("cutoff", cutoff))
            .await?;
        let cleaned: Vec<KeyRow> = response.take(0)?;
        let removed = cleaned.len() as u64;

        if removed == 0 {
            return Ok(0);
        }

        tracing::debug!(
            "Queue {} cleaned {} {} items older than {}ms",
            self.name,
            removed,
            state,
            age.num_milliseconds()
        );
        self.publish(None);
        Ok(removed)
    }
}

impl QueueEngine for SurrealQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn counts_by_state(&self) -> EngineFuture<'_, AggregateCounts> {
        Box::pin(async move { Ok(self.load_counts().await?) })
    }

    fn get_items(&self, filter: StateFilter, start: u64, end: u64) -> EngineFuture<'_, Vec<Item>> {
        Box::pin(async move { Ok(self.load_items(filter, start, end).await?) })
    }

    fn get_item<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, Option<Item>> {
        Box::pin(async move { Ok(self.fetch(id).await?) })
    }

    fn remove<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, ()> {
        Box::pin(self.delete(id))
    }

    fn force_fail<'a>(&'a self, id: &'a ItemId, reason: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(self.mark_failed(id, reason))
    }

    fn retry<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, ()> {
        Box::pin(self.requeue(id))
    }

    fn clean_older_than(&self, state: LifecycleState, age: Duration) -> EngineFuture<'_, u64> {
        Box::pin(async move { Ok(self.clean(state, age).await?) })
    }

    fn stats(&self) -> EngineFuture<'_, EngineStats> {
        Box::pin(async move { Ok(self.load_stats().await?) })
    }

    fn watch(&self) -> broadcast::Receiver<ItemChanged> {
        self.events.subscribe()
    }
}
