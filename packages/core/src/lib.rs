//! Core domain types for the queue monitor.
//!
//! This crate contains shared types used across all packages:
//! - LifecycleState and StateFilter for selecting items
//! - Item and AggregateCounts for what a queue holds
//! - PageRequest and ItemPage for paginated reads
//! - Events for upstream changes and outbound notifications
//! - EngineStats for engine-level health
//! - The error taxonomy

mod counts;
mod error;
mod events;
mod item;
mod page;
mod state;
mod stats;

pub use counts::AggregateCounts;
pub use error::{EngineError, MonitorError, MonitorResult};
pub use events::{ItemChanged, MonitorEvent};
pub use item::{Item, ItemId};
pub use page::{ItemPage, PageRequest, last_page};
pub use state::{LifecycleState, StateFilter, UnknownState};
pub use stats::EngineStats;
