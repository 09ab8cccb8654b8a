//! Hub actor owning every connection and per-queue subscriber set.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use monitor_core::{MonitorError, MonitorEvent};
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use services::JobQueryService;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::ConnectionId;
use crate::messages::{HubMessage, WatcherMessage};
use crate::watcher::{WatcherActor, WatcherArgs};

/// Tunables for the notification hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    /// At most one broadcast per queue within this window.
    pub throttle: Duration,
    /// Outbound events buffered per connection before new ones are dropped.
    pub buffer: usize,
}

impl HubSettings {
    pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(1500);
    pub const DEFAULT_BUFFER: usize = 64;

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            throttle: Self::DEFAULT_THROTTLE,
            buffer: Self::DEFAULT_BUFFER,
        }
    }
}

/// Startup arguments for the hub.
pub struct HubArgs {
    pub query: JobQueryService,
    pub settings: HubSettings,
}

/// State for the hub actor.
pub struct HubState {
    query: JobQueryService,
    settings: HubSettings,
    /// Outbound buffer of every live connection.
    connections: HashMap<ConnectionId, mpsc::Sender<MonitorEvent>>,
    /// Subscribers by queue. A queue is present only while it has subscribers.
    subscribers: BTreeMap<String, HashSet<ConnectionId>>,
    /// Running watcher of each watched queue.
    watchers: HashMap<String, ActorRef<WatcherMessage>>,
}

impl HubState {
    fn new(args: HubArgs) -> Self {
        Self {
            query: args.query,
            settings: args.settings,
            connections: HashMap::new(),
            subscribers: BTreeMap::new(),
            watchers: HashMap::new(),
        }
    }

    /// Remove one subscription, stopping the watcher when it was the last one.
    fn unsubscribe(&mut self, connection: ConnectionId, queue: &str) {
        let Some(set) = self.subscribers.get_mut(queue) else {
            return;
        };
        if !set.remove(&connection) {
            return;
        }
        tracing::debug!("Connection {} unsubscribed from {}", connection, queue);
        if set.is_empty() {
            self.subscribers.remove(queue);
            if let Some(watcher) = self.watchers.remove(queue) {
                watcher.stop(Some("no subscribers left".to_string()));
            }
        }
    }

    /// Forget a connection and all of its subscriptions.
    fn disconnect(&mut self, connection: ConnectionId) {
        if self.connections.remove(&connection).is_none() {
            return;
        }
        let queues: Vec<String> = self
            .subscribers
            .iter()
            .filter(|(_, set)| set.contains(&connection))
            .map(|(queue, _)| queue.clone())
            .collect();
        for queue in queues {
            self.unsubscribe(connection, &queue);
        }
        tracing::debug!("Connection {} disconnected", connection);
    }

    /// Deliver an event to every subscriber of its queue without blocking.
    fn fan_out(&mut self, event: MonitorEvent) {
        let Some(set) = self.subscribers.get(event.queue()) else {
            return;
        };
        let mut gone = Vec::new();
        for connection in set {
            let Some(sender) = self.connections.get(connection) else {
                continue;
            };
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                // Each event is a full snapshot, so a later one supersedes it.
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Dropped notification for slow connection {} on {}",
                        connection,
                        event.queue()
                    );
                }
                Err(TrySendError::Closed(_)) => gone.push(*connection),
            }
        }
        for connection in gone {
            self.disconnect(connection);
        }
    }
}

async fn spawn_watcher(
    myself: &ActorRef<HubMessage>,
    state: &mut HubState,
    queue: &str,
) -> Result<(), ActorProcessingErr> {
    let args = WatcherArgs {
        queue: queue.to_string(),
        query: state.query.clone(),
        hub: myself.clone(),
        window: state.settings.throttle,
    };
    let (watcher, _handle) = Actor::spawn_linked(None, WatcherActor, args, myself.get_cell())
        .await
        .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn watcher: {}", e)))?;
    state.watchers.insert(queue.to_string(), watcher);
    Ok(())
}

/// Hub actor multiplexing connections onto per-queue watchers.
pub struct HubActor;

impl Actor for HubActor {
    type Msg = HubMessage;
    type State = HubState;
    type Arguments = HubArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Starting notification hub (throttle {}ms)",
            args.settings.throttle.as_millis()
        );
        Ok(HubState::new(args))
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for (_, watcher) in state.watchers.drain() {
            watcher.stop(None);
        }
        tracing::info!("Notification hub stopped");
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            HubMessage::Connect { connection, sender } => {
                state.connections.insert(connection, sender);
                tracing::debug!("Connection {} registered", connection);
            }

            HubMessage::Subscribe {
                connection,
                queue,
                reply,
            } => {
                if !state.query.registry().contains(&queue) {
                    let _ = reply.send(Err(MonitorError::QueueNotFound(queue)));
                    return Ok(());
                }
                if !state.connections.contains_key(&connection) {
                    let _ = reply.send(Err(MonitorError::Hub(format!(
                        "connection {} is not registered",
                        connection
                    ))));
                    return Ok(());
                }

                if !state.watchers.contains_key(&queue)
                    && let Err(e) = spawn_watcher(&myself, state, &queue).await
                {
                    tracing::error!("Could not watch queue {}: {}", queue, e);
                    let _ = reply.send(Err(MonitorError::Hub(e.to_string())));
                    return Ok(());
                }

                state
                    .subscribers
                    .entry(queue.clone())
                    .or_default()
                    .insert(connection);
                tracing::debug!("Connection {} subscribed to {}", connection, queue);
                let _ = reply.send(Ok(()));
            }

            HubMessage::Unsubscribe {
                connection,
                queue,
                reply,
            } => {
                state.unsubscribe(connection, &queue);
                let _ = reply.send(());
            }

            HubMessage::Disconnect { connection } => {
                state.disconnect(connection);
            }

            HubMessage::Broadcast(event) => {
                state.fan_out(event);
            }

            HubMessage::WatchedQueues { reply } => {
                let mut queues: Vec<String> = state.watchers.keys().cloned().collect();
                queues.sort();
                let _ = reply.send(queues);
            }

            HubMessage::SubscriberCount { queue, reply } => {
                let count = state.subscribers.get(&queue).map_or(0, HashSet::len);
                let _ = reply.send(count);
            }

            HubMessage::Shutdown => {
                tracing::info!("Shutting down notification hub");
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let (cell, reason) = match message {
            SupervisionEvent::ActorFailed(cell, err) => (cell, err.to_string()),
            SupervisionEvent::ActorTerminated(cell, _, reason) => (cell, format!("{:?}", reason)),
            _ => return Ok(()),
        };

        // Watchers stopped on purpose are no longer in the map.
        let Some(queue) = state
            .watchers
            .iter()
            .find(|(_, watcher)| watcher.get_id() == cell.get_id())
            .map(|(queue, _)| queue.clone())
        else {
            return Ok(());
        };

        tracing::warn!("Watcher for queue {} exited: {}", queue, reason);
        state.watchers.remove(&queue);
        if state.subscribers.contains_key(&queue) {
            match spawn_watcher(&myself, state, &queue).await {
                Ok(()) => tracing::info!("Restarted watcher for queue {}", queue),
                Err(e) => tracing::error!("Could not restart watcher for {}: {}", queue, e),
            }
        }
        Ok(())
    }
}
