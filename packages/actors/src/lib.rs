//! Notification hub for queue observers.
//!
//! This crate provides the Ractor-based actors that push fresh queue
//! counts to subscribed connections.
//!
//! # Architecture
//!
//! - `HubActor` - Owns connections and per-queue subscriber sets
//! - `WatcherActor` - Holds one queue's upstream subscription and throttles broadcasts
//!
//! A queue has a watcher exactly while it has at least one subscriber.
//!
//! # Usage
//!
//! ```ignore
//! use actors::{HubSettings, NotificationHub};
//!
//! let (hub, _handle) = NotificationHub::start(query, HubSettings::default()).await?;
//! let mut connection = hub.connect()?;
//! let counts = connection.subscribe("emails").await?;
//! while let Some(event) = connection.recv().await { ... }
//! ```

mod handle;
mod hub;
mod messages;
mod watcher;

pub use handle::{Connection, ConnectionId, NotificationHub};
pub use hub::{HubActor, HubSettings};
pub use messages::{HubMessage, WatcherMessage};
pub use watcher::{Throttle, WatcherActor};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef};
