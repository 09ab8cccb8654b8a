//! Transport-facing surface of the queue monitor.
//!
//! This crate wires the services and the notification hub together:
//! - Configuration from `MONITOR_*` environment variables
//! - Initialization over SurrealDB-backed queues
//! - The `Monitor` facade (list, get, delete, retry, bulk clear, connect)
//! - SSE formatting for pushed events

mod config;
mod init;
mod monitor;
mod realtime;

pub use config::{ConfigError, MonitorConfig};
pub use init::{InitError, MonitorRuntime, init_monitor};
pub use monitor::{ListItemsQuery, Monitor};
pub use realtime::{format_sse_event, stream_sse};

// Re-export core types for convenience
pub use actors::{Connection, ConnectionId};
pub use monitor_core::{
    AggregateCounts, EngineStats, Item, ItemId, ItemPage, LifecycleState, MonitorError,
    MonitorEvent, StateFilter,
};
pub use services::{QueueSummary, RemoveOutcome};
