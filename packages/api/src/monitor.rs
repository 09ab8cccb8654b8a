//! The monitor facade: every transport-facing operation as a plain async call.

use std::str::FromStr;
use std::sync::Arc;

use actors::{Connection, NotificationHub};
use monitor_core::{
    AggregateCounts, EngineStats, Item, ItemId, ItemPage, MonitorError, MonitorResult,
    PageRequest, StateFilter,
};
use serde::{Deserialize, Serialize};
use services::{JobMutationService, JobQueryService, QueueRegistry, QueueSummary, RemoveOutcome};
use tokio::task::JoinHandle;

use crate::config::MonitorConfig;
use crate::init::InitError;

/// Query parameters for listing items, as a transport would receive them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
    /// `"latest"` or a lifecycle state name.
    #[serde(default)]
    pub filter: Option<String>,
}

impl ListItemsQuery {
    /// Validate into a page request for `queue`.
    pub fn into_request(self, queue: &str) -> MonitorResult<PageRequest> {
        let filter = match self.filter.as_deref() {
            Some(filter) => parse_filter(filter)?,
            None => StateFilter::Latest,
        };
        let mut request = PageRequest::new(queue)
            .with_filter(filter)
            .with_page(self.page.unwrap_or(0));
        if let Some(page_size) = self.page_size {
            request = request.with_page_size(page_size);
        }
        Ok(request)
    }
}

fn parse_filter(filter: &str) -> MonitorResult<StateFilter> {
    StateFilter::from_str(filter).map_err(|e| MonitorError::InvalidRequest(e.to_string()))
}

/// Running monitor over a set of registered queues.
#[derive(Clone)]
pub struct Monitor {
    query: JobQueryService,
    mutation: JobMutationService,
    hub: NotificationHub,
}

impl Monitor {
    /// Build the services over `registry` and start the notification hub.
    pub async fn start(
        registry: Arc<QueueRegistry>,
        config: &MonitorConfig,
    ) -> Result<(Self, JoinHandle<()>), InitError> {
        config.validate()?;
        let query = JobQueryService::new(registry.clone())
            .with_timeout(config.engine_timeout)
            .with_max_page_size(config.max_page_size);
        let mutation = JobMutationService::new(registry)
            .with_timeout(config.engine_timeout)
            .with_clean_grace(config.clean_grace);
        let (hub, handle) = NotificationHub::start(query.clone(), config.hub_settings())
            .await
            .map_err(|e| InitError::Hub(e.to_string()))?;
        Ok((
            Self {
                query,
                mutation,
                hub,
            },
            handle,
        ))
    }

    pub fn registry(&self) -> &Arc<QueueRegistry> {
        self.query.registry()
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Names of all monitored queues.
    pub fn list_queues(&self) -> Vec<String> {
        self.query.list_queues()
    }

    /// Counts for every queue.
    pub async fn overview(&self) -> Vec<QueueSummary> {
        self.query.overview().await
    }

    /// One page of a queue's items.
    pub async fn list_items(&self, queue: &str, query: ListItemsQuery) -> MonitorResult<ItemPage> {
        let request = query.into_request(queue)?;
        self.query.list_items(&request).await
    }

    pub async fn get_item(&self, queue: &str, id: &str) -> MonitorResult<Item> {
        self.query.get_item(queue, &ItemId::from(id)).await
    }

    pub async fn counts(&self, queue: &str) -> MonitorResult<AggregateCounts> {
        self.query.counts(queue).await
    }

    /// Engine version and health gauges for the engine behind `queue`.
    pub async fn stats(&self, queue: &str) -> MonitorResult<EngineStats> {
        self.query.stats(queue).await
    }

    /// Delete an item; a refused removal leaves it failed instead.
    pub async fn delete_item(&self, queue: &str, id: &str) -> MonitorResult<RemoveOutcome> {
        self.mutation.remove_item(queue, &ItemId::from(id)).await
    }

    pub async fn retry_item(&self, queue: &str, id: &str) -> MonitorResult<()> {
        self.mutation.retry_item(queue, &ItemId::from(id)).await
    }

    /// Clear all items in `state` older than the grace period.
    pub async fn bulk_clear(&self, queue: &str, state: &str) -> MonitorResult<u64> {
        let filter = parse_filter(state)?;
        self.mutation.bulk_clear(queue, filter).await
    }

    /// Open an observer connection for push notifications.
    pub fn connect(&self) -> MonitorResult<Connection> {
        self.hub.connect()
    }

    /// Stop the notification hub. Reads and mutations keep working.
    pub fn shutdown(&self) {
        self.hub.shutdown();
    }
}
