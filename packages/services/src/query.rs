//! Read side of the monitor: pages of items and aggregate counts.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use monitor_core::{
    AggregateCounts, EngineStats, Item, ItemId, ItemPage, MonitorError, MonitorResult,
    PageRequest, last_page,
};

use crate::call::{item_call, queue_call};
use crate::registry::QueueRegistry;

/// Counts for one queue in an overview.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSummary {
    pub name: String,
    /// Counts, or the reason they could not be read.
    pub counts: Result<AggregateCounts, MonitorError>,
}

/// Answers point-in-time reads against registered queues.
///
/// Stateless apart from its configuration; clones share the registry.
#[derive(Clone)]
pub struct JobQueryService {
    registry: Arc<QueueRegistry>,
    timeout: Duration,
    max_page_size: u64,
}

impl JobQueryService {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_MAX_PAGE_SIZE: u64 = 1000;

    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self {
            registry,
            timeout: Self::DEFAULT_TIMEOUT,
            max_page_size: Self::DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Set how long a single engine call may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the largest page size a caller may request.
    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn registry(&self) -> &Arc<QueueRegistry> {
        &self.registry
    }

    /// Names of all registered queues.
    pub fn list_queues(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Fresh aggregate counts for a queue.
    pub async fn counts(&self, queue: &str) -> MonitorResult<AggregateCounts> {
        let engine = self.registry.lookup(queue)?;
        queue_call(queue, self.timeout, engine.counts_by_state()).await
    }

    /// Serve one page of a queue's items.
    ///
    /// A page past the end is clamped to the last page that still holds
    /// items; the served page is reported in [`ItemPage::page`].
    pub async fn list_items(&self, request: &PageRequest) -> MonitorResult<ItemPage> {
        if request.page_size == 0 {
            return Err(MonitorError::InvalidRequest(
                "page size must be greater than zero".to_string(),
            ));
        }
        if request.page_size > self.max_page_size {
            return Err(MonitorError::InvalidRequest(format!(
                "page size {} exceeds the maximum of {}",
                request.page_size, self.max_page_size
            )));
        }

        let queue = request.queue.as_str();
        let engine = self.registry.lookup(queue)?;

        let counts = queue_call(queue, self.timeout, engine.counts_by_state()).await?;
        let total_count = counts.matching(request.filter);
        let page = request.page.min(last_page(total_count, request.page_size));
        if page != request.page {
            tracing::debug!(
                "Clamped page {} to {} for queue {} ({} items)",
                request.page,
                page,
                queue,
                total_count
            );
        }

        let start = page.saturating_mul(request.page_size);
        let end = start.saturating_add(request.page_size);
        let items = queue_call(
            queue,
            self.timeout,
            engine.get_items(request.filter, start, end),
        )
        .await?;

        Ok(ItemPage {
            items,
            page,
            page_size: request.page_size,
            total_count,
            counts,
        })
    }

    /// Full detail of a single item.
    pub async fn get_item(&self, queue: &str, id: &ItemId) -> MonitorResult<Item> {
        let engine = self.registry.lookup(queue)?;
        item_call(queue, id.as_str(), self.timeout, engine.get_item(id))
            .await?
            .ok_or_else(|| MonitorError::ItemNotFound {
                queue: queue.to_string(),
                id: id.to_string(),
            })
    }

    /// Version and health gauges of the engine behind `queue`.
    pub async fn stats(&self, queue: &str) -> MonitorResult<EngineStats> {
        let engine = self.registry.lookup(queue)?;
        queue_call(queue, self.timeout, engine.stats()).await
    }

    /// Counts for every registered queue, read concurrently.
    ///
    /// One unreachable queue does not fail the overview.
    pub async fn overview(&self) -> Vec<QueueSummary> {
        let reads = self.registry.names().into_iter().map(|name| async move {
            let counts = self.counts(&name).await;
            QueueSummary { name, counts }
        });
        join_all(reads).await
    }
}
