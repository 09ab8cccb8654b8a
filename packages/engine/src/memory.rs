//! In-memory queue engine.
//!
//! Mirrors [`SurrealQueue`](crate::SurrealQueue) semantics without storage,
//! and records how often each operation was called so tests can assert on
//! engine traffic. Failures can be injected per operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_core::{
    AggregateCounts, EngineError, EngineStats, Item, ItemChanged, ItemId, LifecycleState,
    StateFilter,
};
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::lifecycle;
use crate::traits::{EngineFuture, EngineResult, QueueEngine};

/// Operations of the [`QueueEngine`] contract, for counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    CountsByState,
    GetItems,
    GetItem,
    Remove,
    ForceFail,
    Retry,
    CleanOlderThan,
    Stats,
}

struct Entry {
    item: Item,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    calls: HashMap<EngineOp, usize>,
    failures: HashMap<EngineOp, EngineError>,
    latency: Option<Duration>,
}

/// A queue held entirely in memory.
pub struct MemoryQueue {
    name: String,
    inner: Mutex<Inner>,
    events: broadcast::Sender<ItemChanged>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            name: name.into(),
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, item_id: Option<ItemId>) {
        let event = match item_id {
            Some(id) => ItemChanged::item(&self.name, id),
            None => ItemChanged::queue(&self.name),
        };
        let _ = self.events.send(event);
    }

    /// Enqueue a new waiting item with a generated id.
    pub fn add(&self, payload: serde_json::Value) -> Item {
        self.insert(Item::new(Ulid::new().to_string(), payload))
    }

    /// Store an item exactly as given, replacing any item with the same id.
    pub fn insert(&self, item: Item) -> Item {
        {
            let mut inner = self.lock();
            inner.entries.retain(|e| e.item.id != item.id);
            inner.entries.push(Entry {
                updated_at: item.last_transition_at(),
                item: item.clone(),
            });
        }
        self.publish(Some(item.id.clone()));
        item
    }

    /// Move an item into `state`, as a worker would.
    pub fn transition(&self, id: &ItemId, state: LifecycleState) -> EngineResult<Item> {
        let item = {
            let mut inner = self.lock();
            let entry = inner
                .entries
                .iter_mut()
                .find(|e| &e.item.id == id)
                .ok_or_else(|| lifecycle::not_found(&self.name, id))?;
            let now = Utc::now();
            lifecycle::apply(&mut entry.item, state, now);
            entry.updated_at = now;
            entry.item.clone()
        };
        self.publish(Some(id.clone()));
        Ok(item)
    }

    /// Number of times `op` was invoked through the engine contract.
    pub fn calls(&self, op: EngineOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Make every subsequent `op` call fail with `error`.
    pub fn fail_with(&self, op: EngineOp, error: EngineError) {
        self.lock().failures.insert(op, error);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Number of live change subscriptions on this queue.
    pub fn watcher_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Delay every engine call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Count the call, apply latency, and return an injected failure if any.
    async fn enter(&self, op: EngineOp) -> EngineResult<()> {
        let (latency, failure) = {
            let mut inner = self.lock();
            *inner.calls.entry(op).or_insert(0) += 1;
            (inner.latency, inner.failures.get(&op).cloned())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        failure.map_or(Ok(()), Err)
    }

    fn with_item<T>(
        &self,
        id: &ItemId,
        f: impl FnOnce(&mut Entry) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| &e.item.id == id)
            .ok_or_else(|| lifecycle::not_found(&self.name, id))?;
        f(entry)
    }
}

impl QueueEngine for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn counts_by_state(&self) -> EngineFuture<'_, AggregateCounts> {
        Box::pin(async move {
            self.enter(EngineOp::CountsByState).await?;
            let inner = self.lock();
            Ok(inner.entries.iter().map(|e| (e.item.state, 1)).collect())
        })
    }

    fn get_items(&self, filter: StateFilter, start: u64, end: u64) -> EngineFuture<'_, Vec<Item>> {
        Box::pin(async move {
            self.enter(EngineOp::GetItems).await?;
            let inner = self.lock();
            let mut items: Vec<&Item> = inner
                .entries
                .iter()
                .map(|e| &e.item)
                .filter(|item| filter.matches(item.state))
                .collect();
            items.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });
            Ok(items
                .into_iter()
                .skip(start as usize)
                .take(end.saturating_sub(start) as usize)
                .cloned()
                .collect())
        })
    }

    fn get_item<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, Option<Item>> {
        Box::pin(async move {
            self.enter(EngineOp::GetItem).await?;
            let inner = self.lock();
            Ok(inner
                .entries
                .iter()
                .find(|e| &e.item.id == id)
                .map(|e| e.item.clone()))
        })
    }

    fn remove<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.enter(EngineOp::Remove).await?;
            {
                let mut inner = self.lock();
                let position = inner
                    .entries
                    .iter()
                    .position(|e| &e.item.id == id)
                    .ok_or_else(|| lifecycle::not_found(&self.name, id))?;
                lifecycle::ensure_removable(&inner.entries[position].item)?;
                inner.entries.remove(position);
            }
            self.publish(Some(id.clone()));
            Ok(())
        })
    }

    fn force_fail<'a>(&'a self, id: &'a ItemId, reason: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.enter(EngineOp::ForceFail).await?;
            self.with_item(id, |entry| {
                let now = Utc::now();
                lifecycle::fail(&mut entry.item, reason, now);
                entry.updated_at = now;
                Ok(())
            })?;
            self.publish(Some(id.clone()));
            Ok(())
        })
    }

    fn retry<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.enter(EngineOp::Retry).await?;
            self.with_item(id, |entry| {
                lifecycle::ensure_retryable(&entry.item)?;
                let now = Utc::now();
                lifecycle::apply(&mut entry.item, LifecycleState::Waiting, now);
                entry.updated_at = now;
                Ok(())
            })?;
            self.publish(Some(id.clone()));
            Ok(())
        })
    }

    fn clean_older_than(&self, state: LifecycleState, age: Duration) -> EngineFuture<'_, u64> {
        Box::pin(async move {
            self.enter(EngineOp::CleanOlderThan).await?;
            let age = chrono::Duration::from_std(age)
                .map_err(|e| EngineError::Rejected(format!("invalid clean age: {}", e)))?;
            let cutoff = Utc::now() - age;
            let removed = {
                let mut inner = self.lock();
                let before = inner.entries.len();
                inner
                    .entries
                    .retain(|e| !(e.item.state == state && e.updated_at < cutoff));
                (before - inner.entries.len()) as u64
            };
            if removed > 0 {
                self.publish(None);
            }
            Ok(removed)
        })
    }

    fn stats(&self) -> EngineFuture<'_, EngineStats> {
        Box::pin(async move {
            self.enter(EngineOp::Stats).await?;
            let stored_items = self.lock().entries.len() as u64;
            Ok(EngineStats::new("memory", env!("CARGO_PKG_VERSION"))
                .with_metric("stored_items", stored_items)
                .with_metric("watchers", self.watcher_count() as u64))
        })
    }

    fn watch(&self) -> broadcast::Receiver<ItemChanged> {
        self.events.subscribe()
    }
}
