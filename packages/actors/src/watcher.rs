//! Per-queue watcher actor.
//!
//! Owns the single upstream subscription of a watched queue and the
//! throttle state deciding when fresh counts go out.

use chrono::Utc;
use engine::QueueEngine;
use monitor_core::{ItemChanged, MonitorEvent};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use services::JobQueryService;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::messages::{HubMessage, WatcherMessage};

/// Throttle position of a watched queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// No broadcast is scheduled.
    Idle,
    /// A trailing broadcast will fire at `scheduled_at`.
    PendingBroadcast { scheduled_at: Instant },
}

/// Startup arguments for a watcher.
pub struct WatcherArgs {
    pub queue: String,
    pub query: JobQueryService,
    pub hub: ActorRef<HubMessage>,
    /// Minimum spacing between two broadcasts.
    pub window: Duration,
}

/// State for the watcher actor.
pub struct WatcherState {
    queue: String,
    query: JobQueryService,
    hub: ActorRef<HubMessage>,
    window: Duration,
    throttle: Throttle,
    /// When counts were last sent to the hub.
    last_broadcast: Option<Instant>,
    /// Task relaying engine events into the mailbox; holds the upstream receiver.
    forwarder: JoinHandle<()>,
}

impl WatcherState {
    /// Whether a broadcast right now would respect the window.
    fn window_elapsed(&self, now: Instant) -> bool {
        self.last_broadcast
            .is_none_or(|last| now.duration_since(last) >= self.window)
    }

    /// Read fresh counts and hand them to the hub.
    ///
    /// A failed read skips this broadcast; the next change retries.
    async fn broadcast(&mut self) {
        match self.query.counts(&self.queue).await {
            Ok(counts) => {
                self.last_broadcast = Some(Instant::now());
                let event = MonitorEvent::CountsChanged {
                    queue: self.queue.clone(),
                    counts,
                    timestamp: Utc::now(),
                };
                tracing::debug!("{}", event.description());
                if let Err(e) = self.hub.send_message(HubMessage::Broadcast(event)) {
                    tracing::warn!("Hub unreachable from watcher {}: {}", self.queue, e);
                }
            }
            Err(e) => {
                tracing::warn!("Skipping broadcast for queue {}: {}", self.queue, e);
            }
        }
    }
}

/// Relay upstream changes into the watcher's mailbox until either side goes away.
fn spawn_forwarder(engine: &dyn QueueEngine, watcher: ActorRef<WatcherMessage>) -> JoinHandle<()> {
    let mut changes = engine.watch();
    let queue = engine.name().to_string();
    tokio::spawn(async move {
        loop {
            let change = match changes.recv().await {
                Ok(change) => change,
                // Missed events still mean something changed.
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("Watcher for {} lagged by {} events", queue, missed);
                    ItemChanged::queue(&queue)
                }
                Err(RecvError::Closed) => break,
            };
            if watcher.send_message(WatcherMessage::Changed(change)).is_err() {
                break;
            }
        }
    })
}

/// Watcher actor for a single queue.
pub struct WatcherActor;

impl Actor for WatcherActor {
    type Msg = WatcherMessage;
    type State = WatcherState;
    type Arguments = WatcherArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let engine = args.query.registry().lookup(&args.queue)?;
        let forwarder = spawn_forwarder(engine.as_ref(), myself);
        tracing::info!("Watching queue: {}", args.queue);

        Ok(WatcherState {
            queue: args.queue,
            query: args.query,
            hub: args.hub,
            window: args.window,
            throttle: Throttle::Idle,
            last_broadcast: None,
            forwarder,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.forwarder.abort();
        tracing::info!("Stopped watching queue: {}", state.queue);
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WatcherMessage::Changed(_) => match state.throttle {
                Throttle::PendingBroadcast { .. } => {}
                Throttle::Idle => {
                    let now = Instant::now();
                    let last_broadcast = state.last_broadcast;
                    match last_broadcast {
                        Some(last) if !state.window_elapsed(now) => {
                            let scheduled_at = last + state.window;
                            state.throttle = Throttle::PendingBroadcast { scheduled_at };
                            tokio::spawn(async move {
                                tokio::time::sleep_until(scheduled_at).await;
                                let _ = myself.send_message(WatcherMessage::Flush);
                            });
                        }
                        _ => state.broadcast().await,
                    }
                }
            },

            WatcherMessage::Flush => {
                if let Throttle::PendingBroadcast { .. } = state.throttle {
                    state.throttle = Throttle::Idle;
                    state.broadcast().await;
                }
            }
        }

        Ok(())
    }
}
