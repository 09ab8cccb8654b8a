//! The contract the monitor consumes from a queue engine.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use monitor_core::{
    AggregateCounts, EngineError, EngineStats, Item, ItemChanged, ItemId, LifecycleState,
    StateFilter,
};
use tokio::sync::broadcast;

/// Result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Future type for async engine calls.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = EngineResult<T>> + Send + 'a>>;

/// Handle on one named queue inside an external work-queue engine.
///
/// Implementations own storage, locking and delivery; the monitor only reads
/// through this handle and asks it to perform lifecycle operations.
pub trait QueueEngine: Send + Sync + 'static {
    /// Name of the queue this handle is bound to.
    fn name(&self) -> &str;

    /// Item count per lifecycle state.
    fn counts_by_state(&self) -> EngineFuture<'_, AggregateCounts>;

    /// Items selected by `filter` in the half-open range `start..end`.
    ///
    /// [`StateFilter::Latest`] returns items across all states, most recent first.
    fn get_items(&self, filter: StateFilter, start: u64, end: u64) -> EngineFuture<'_, Vec<Item>>;

    /// A single item, or `None` when it does not exist.
    fn get_item<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, Option<Item>>;

    /// Remove an item.
    fn remove<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, ()>;

    /// Move an item into the failed state regardless of locks.
    fn force_fail<'a>(&'a self, id: &'a ItemId, reason: &'a str) -> EngineFuture<'a, ()>;

    /// Put a failed item back into the waiting state.
    fn retry<'a>(&'a self, id: &'a ItemId) -> EngineFuture<'a, ()>;

    /// Remove items in `state` whose last transition is older than `age`.
    fn clean_older_than(&self, state: LifecycleState, age: Duration) -> EngineFuture<'_, u64>;

    /// Version and health gauges of the engine backing this queue.
    fn stats(&self) -> EngineFuture<'_, EngineStats>;

    /// Subscribe to change events for this queue.
    ///
    /// The subscription lasts as long as the returned receiver.
    fn watch(&self) -> broadcast::Receiver<ItemChanged>;
}
