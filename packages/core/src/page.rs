//! Page requests and their results.

use serde::{Deserialize, Serialize};

use crate::{AggregateCounts, Item, StateFilter};

/// Request for one page of a queue's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Queue to read from.
    pub queue: String,
    /// Which items to include.
    #[serde(default)]
    pub filter: StateFilter,
    /// Zero-based page index.
    #[serde(default)]
    pub page: u64,
    /// Items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page_size() -> u64 {
    PageRequest::DEFAULT_PAGE_SIZE
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u64 = 10;

    /// First page of the latest items.
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            filter: StateFilter::Latest,
            page: 0,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<StateFilter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Last page index that still holds items, or 0 when there are none.
///
/// Never exceeds `total_count / page_size`. `page_size` must be non-zero.
pub fn last_page(total_count: u64, page_size: u64) -> u64 {
    if total_count == 0 {
        0
    } else {
        (total_count - 1) / page_size
    }
}

/// One page of items plus the counts it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPage {
    /// Items on this page, in engine order.
    pub items: Vec<Item>,
    /// Page actually served. Lower than requested when the request was clamped.
    pub page: u64,
    /// Items per page.
    pub page_size: u64,
    /// Items matching the filter.
    pub total_count: u64,
    /// Counts read while serving the page. Advisory under concurrent mutation.
    pub counts: AggregateCounts,
}

impl ItemPage {
    /// Check whether the served page differs from the requested one.
    pub fn was_clamped(&self, requested: u64) -> bool {
        self.page != requested
    }
}
