//! Client-side handles onto the hub actor.

use std::fmt;

use monitor_core::{AggregateCounts, MonitorError, MonitorEvent, MonitorResult};
use ractor::{Actor, ActorRef, RpcReplyPort};
use services::JobQueryService;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::hub::{HubActor, HubArgs, HubSettings};
use crate::messages::HubMessage;

/// Identifier of one observer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Send a request to the hub and wait for its reply.
async fn request<T>(
    hub: &ActorRef<HubMessage>,
    build: impl FnOnce(RpcReplyPort<T>) -> HubMessage,
) -> MonitorResult<T>
where
    T: Send + 'static,
{
    let (tx, rx) = ractor::concurrency::oneshot();
    hub.send_message(build(tx.into()))
        .map_err(|e| MonitorError::Hub(format!("Failed to send message: {}", e)))?;
    rx.await
        .map_err(|_| MonitorError::Hub("Failed to receive response".to_string()))
}

/// Handle on a running notification hub. Cheap to clone.
#[derive(Clone)]
pub struct NotificationHub {
    hub: ActorRef<HubMessage>,
    query: JobQueryService,
    buffer: usize,
}

impl NotificationHub {
    /// Spawn the hub actor.
    pub async fn start(
        query: JobQueryService,
        settings: HubSettings,
    ) -> Result<(Self, JoinHandle<()>), ractor::SpawnErr> {
        let args = HubArgs {
            query: query.clone(),
            settings,
        };
        let (hub, handle) = Actor::spawn(None, HubActor, args).await?;
        Ok((
            Self {
                hub,
                query,
                buffer: settings.buffer.max(1),
            },
            handle,
        ))
    }

    /// Open a new observer connection.
    pub fn connect(&self) -> MonitorResult<Connection> {
        let id = ConnectionId::new();
        let (sender, events) = mpsc::channel(self.buffer);
        self.hub
            .send_message(HubMessage::Connect {
                connection: id,
                sender,
            })
            .map_err(|e| MonitorError::Hub(format!("Failed to send message: {}", e)))?;
        Ok(Connection {
            id,
            hub: self.hub.clone(),
            query: self.query.clone(),
            events,
        })
    }

    /// Queues that currently have an upstream subscription, sorted.
    pub async fn watched_queues(&self) -> MonitorResult<Vec<String>> {
        request(&self.hub, |reply| HubMessage::WatchedQueues { reply }).await
    }

    /// Number of connections subscribed to `queue`.
    pub async fn subscriber_count(&self, queue: &str) -> MonitorResult<usize> {
        let queue = queue.to_string();
        request(&self.hub, |reply| HubMessage::SubscriberCount { queue, reply }).await
    }

    /// Stop the hub and every watcher.
    pub fn shutdown(&self) {
        let _ = self.hub.send_message(HubMessage::Shutdown);
    }
}

/// One observer's session with the hub.
///
/// Dropping it removes all of its subscriptions.
pub struct Connection {
    id: ConnectionId,
    hub: ActorRef<HubMessage>,
    query: JobQueryService,
    events: mpsc::Receiver<MonitorEvent>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Start receiving count updates for `queue`.
    ///
    /// Returns the queue's current counts. The subscription is registered
    /// before they are read, so no later change goes unreported.
    pub async fn subscribe(&self, queue: &str) -> MonitorResult<AggregateCounts> {
        let connection = self.id;
        let name = queue.to_string();
        request(&self.hub, |reply| HubMessage::Subscribe {
            connection,
            queue: name,
            reply,
        })
        .await??;
        self.query.counts(queue).await
    }

    /// Stop receiving updates for `queue`. Unsubscribing twice is harmless.
    pub async fn unsubscribe(&self, queue: &str) -> MonitorResult<()> {
        let connection = self.id;
        let queue = queue.to_string();
        request(&self.hub, |reply| HubMessage::Unsubscribe {
            connection,
            queue,
            reply,
        })
        .await
    }

    /// Next pushed event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        self.events.recv().await
    }

    /// Next already-buffered event, if any.
    pub fn try_recv(&mut self) -> Option<MonitorEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.hub.send_message(HubMessage::Disconnect {
            connection: self.id,
        });
    }
}
