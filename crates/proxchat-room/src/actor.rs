//! Store actor: the single writer of a session's room state.
//!
//! The relay hub connection and the game backend both produce events
//! concurrently. Neither touches [`RoomState`] directly; they send commands
//! to one Tokio task that owns the [`RoomStore`] and applies them one at a
//! time. After each command the actor publishes a fresh snapshot on a
//! `watch` channel, then fans the notifications out on a `broadcast`
//! channel.
//!
//! ```text
//!   relay hub ─┐                      ┌─▶ watch<RoomState>     (latest snapshot)
//!              ├─▶ mpsc ─▶ StoreActor ┤
//!   backend ───┘                      └─▶ broadcast<RoomNotification>
//! ```
//!
//! A multi-step command (reset, a bulk backend event) is applied in full
//! before the next snapshot goes out, so readers never see half of it.

use proxchat_protocol::{BackendEvent, RoomEvent};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{RoomError, RoomNotification, RoomState, RoomStore};

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Channel sizing for the store actor.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Bounded command queue. Senders wait when it is full.
    pub command_buffer: usize,
    /// Notifications a slow subscriber may fall behind before it starts
    /// seeing `RecvError::Lagged`.
    pub notification_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            command_buffer: 256,
            notification_capacity: 1024,
        }
    }
}

impl StoreConfig {
    /// Clamp zero sizes, which Tokio channels reject with a panic.
    pub fn validated(mut self) -> Self {
        if self.command_buffer == 0 {
            tracing::warn!("command_buffer must be >= 1, using 1");
            self.command_buffer = 1;
        }
        if self.notification_capacity == 0 {
            tracing::warn!("notification_capacity must be >= 1, using 1");
            self.notification_capacity = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

type Reply = oneshot::Sender<Result<(), RoomError>>;

/// Commands sent to the store actor through its channel.
///
/// `reply` is `None` for fire-and-forget sends.
pub(crate) enum StoreCommand {
    Dispatch {
        event: RoomEvent,
        reply: Option<Reply>,
    },
    Backend {
        event: BackendEvent,
        reply: Option<Reply>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// RoomStoreHandle
// ---------------------------------------------------------------------------

/// Handle to a running store actor.
///
/// Cheap to clone. The actor stops once every handle is dropped or
/// [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct RoomStoreHandle {
    sender: mpsc::Sender<StoreCommand>,
    snapshot: watch::Receiver<RoomState>,
    notify: broadcast::Sender<RoomNotification>,
}

impl RoomStoreHandle {
    /// Applies a relay-hub event and waits for the result.
    ///
    /// # Errors
    /// Whatever [`RoomStore::dispatch`] rejected the event with, or
    /// [`RoomError::Unavailable`] if the actor is gone.
    pub async fn dispatch(&self, event: RoomEvent) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StoreCommand::Dispatch {
            event,
            reply: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Applies a backend event and waits for the result.
    pub async fn apply_backend(&self, event: BackendEvent) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StoreCommand::Backend {
            event,
            reply: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Queues a backend event without waiting for it to be applied.
    ///
    /// Backend pumps use this so a busy store never stalls the upstream
    /// socket. Rejections are logged by the actor.
    pub async fn push_backend(&self, event: BackendEvent) -> Result<(), RoomError> {
        self.send(StoreCommand::Backend { event, reply: None }).await
    }

    /// Runs the reset sequence in one actor turn and waits for it.
    pub async fn reset(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StoreCommand::Reset { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// The latest published state. Never blocks on the actor.
    pub fn snapshot(&self) -> RoomState {
        self.snapshot.borrow().clone()
    }

    /// A receiver that is woken on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<RoomState> {
        self.snapshot.clone()
    }

    /// Subscribes to notifications applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomNotification> {
        self.notify.subscribe()
    }

    /// Tells the actor to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(StoreCommand::Shutdown).await
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: StoreCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// StoreActor
// ---------------------------------------------------------------------------

struct StoreActor {
    store: RoomStore,
    receiver: mpsc::Receiver<StoreCommand>,
    snapshot: watch::Sender<RoomState>,
    notify: broadcast::Sender<RoomNotification>,
}

impl StoreActor {
    async fn run(mut self) {
        tracing::debug!("room store started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                StoreCommand::Dispatch { event, reply } => {
                    let kind = event.kind();
                    let result = self.store.dispatch(event);
                    let result = self.finish(kind, result);
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                StoreCommand::Backend { event, reply } => {
                    let result = self.store.apply_backend(event);
                    let result = self.finish("backend", result);
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                StoreCommand::Reset { reply } => {
                    let notes = self.store.reset();
                    tracing::info!("room state reset");
                    self.publish(notes);
                    let _ = reply.send(());
                }
                StoreCommand::Shutdown => break,
            }
        }

        tracing::debug!("room store stopped");
    }

    /// Publishes on success, logs and drops on failure.
    fn finish(
        &self,
        kind: &'static str,
        result: Result<Vec<RoomNotification>, RoomError>,
    ) -> Result<(), RoomError> {
        match result {
            Ok(notes) => {
                self.publish(notes);
                Ok(())
            }
            Err(e) => {
                match &e {
                    RoomError::UnknownClient(_) | RoomError::UnknownPlayer(_) => {
                        tracing::debug!(kind, error = %e, "update for unknown client dropped");
                    }
                    _ => tracing::warn!(kind, error = %e, "event rejected"),
                }
                Err(e)
            }
        }
    }

    fn publish(&self, notes: Vec<RoomNotification>) {
        if notes.is_empty() {
            return;
        }
        self.snapshot.send_replace(self.store.state().clone());
        for note in notes {
            // No subscribers is fine.
            let _ = self.notify.send(note);
        }
    }
}

/// Spawns a store actor with an empty [`RoomState`] and returns its handle.
pub fn spawn_store(config: StoreConfig) -> RoomStoreHandle {
    spawn_store_with(RoomStore::new(), config)
}

/// Spawns a store actor around an existing store.
pub fn spawn_store_with(store: RoomStore, config: StoreConfig) -> RoomStoreHandle {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (snapshot_tx, snapshot_rx) = watch::channel(store.state().clone());
    let (notify_tx, _) = broadcast::channel(config.notification_capacity);

    let actor = StoreActor {
        store,
        receiver: rx,
        snapshot: snapshot_tx,
        notify: notify_tx.clone(),
    };

    tokio::spawn(actor.run());

    RoomStoreHandle {
        sender: tx,
        snapshot: snapshot_rx,
        notify: notify_tx,
    }
}
