//! Message types for actor communication.

use monitor_core::{ItemChanged, MonitorError, MonitorEvent};
use ractor::RpcReplyPort;
use tokio::sync::mpsc;

use crate::ConnectionId;

/// Messages for the HubActor.
#[derive(Debug)]
pub enum HubMessage {
    /// Register a connection and its outbound buffer.
    Connect {
        connection: ConnectionId,
        sender: mpsc::Sender<MonitorEvent>,
    },

    /// Add a connection to a queue's subscribers.
    Subscribe {
        connection: ConnectionId,
        queue: String,
        reply: RpcReplyPort<Result<(), MonitorError>>,
    },

    /// Remove a connection from a queue's subscribers. Always succeeds.
    Unsubscribe {
        connection: ConnectionId,
        queue: String,
        reply: RpcReplyPort<()>,
    },

    /// Drop a connection and every subscription it holds.
    Disconnect { connection: ConnectionId },

    /// Fan an event out to the subscribers of its queue.
    Broadcast(MonitorEvent),

    /// Get the queues that currently have a watcher.
    WatchedQueues { reply: RpcReplyPort<Vec<String>> },

    /// Get the number of connections subscribed to a queue.
    SubscriberCount {
        queue: String,
        reply: RpcReplyPort<usize>,
    },

    /// Stop every watcher and the hub itself.
    Shutdown,
}

/// Messages for the WatcherActor.
#[derive(Debug)]
pub enum WatcherMessage {
    /// The engine reported a change in the watched queue.
    Changed(ItemChanged),

    /// A trailing broadcast is due.
    Flush,
}
