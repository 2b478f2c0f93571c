//! Backend for games hosted on an Impostor server with the event hub plugin.
//!
//! # Shape
//!
//! [`ImpostorBackend::try_initialize`] dials the hub, completes the
//! handshake, sends `TrackGame(gameCode)`, then hands the connection to a
//! pump task. The pump is the only reader of the socket, so events are
//! translated in exactly the order the hub sent them:
//!
//! ```text
//!            ┌──────────────── pump task ────────────────┐
//! socket ───▶│ split ─▶ parse ─▶ validate ─▶ translate ──┼──▶ mpsc<BackendEvent>
//!            │                       │                   │
//!            │              PlayerMove ─▶ ThrottleMap ───┤ (on window close)
//!            │   ping every 15s ◀─ interval              │
//!            └───────────────────────────────────────────┘
//! ```
//!
//! Movement is the only deferred class. Everything else is forwarded as
//! soon as it is parsed.

use std::sync::Arc;
use std::time::Duration;

use proxchat_protocol::{BackendEvent, ImpostorParams, Pose};
use proxchat_throttle::{Offer, ThrottleConfig, ThrottleMap};
use proxchat_transport::{Connection, WebSocketConnection};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::hub::{self, HubMessage};
use crate::translate::{ImpostorEvent, TRACK_GAME};
use crate::{Backend, BackendError, BackendStatus};

/// Port the hub plugin listens on when the model doesn't name one.
pub const IMPOSTOR_BACKEND_PORT: u16 = 22024;

/// How often the pump pings the hub so it doesn't time the client out.
pub const PING_INTERVAL: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// ImpostorBackend
// ---------------------------------------------------------------------------

/// Adapter for one Impostor game, identified by its game code.
pub struct ImpostorBackend {
    game_code: String,
    params: ImpostorParams,
    events: mpsc::Sender<BackendEvent>,
    status: Arc<watch::Sender<BackendStatus>>,
    pump: Option<PumpHandle>,
    ping_interval: Duration,
}

struct PumpHandle {
    commands: mpsc::Sender<PumpCommand>,
    task: JoinHandle<()>,
}

enum PumpCommand {
    Track {
        game_code: String,
        reply: oneshot::Sender<Result<(), BackendError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

impl ImpostorBackend {
    /// Creates an idle adapter. Nothing is dialed until `initialize`.
    pub fn new(
        game_code: impl Into<String>,
        params: ImpostorParams,
        events: mpsc::Sender<BackendEvent>,
    ) -> Self {
        let (status, _) = watch::channel(BackendStatus::Idle);
        Self {
            game_code: game_code.into(),
            params,
            events,
            status: Arc::new(status),
            pump: None,
            ping_interval: PING_INTERVAL,
        }
    }

    /// Overrides the keep-alive interval. Zero keeps the default.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.ping_interval = interval;
        }
        self
    }

    /// `ws://{ip}:{port}/hub`.
    pub fn hub_url(&self) -> String {
        let port = self.params.port.unwrap_or(IMPOSTOR_BACKEND_PORT);
        format!("ws://{}:{}/hub", self.params.ip, port)
    }

    pub fn game_code(&self) -> &str {
        &self.game_code
    }

    /// A receiver woken on every status change, including the pump
    /// noticing that the hub went away.
    pub fn status_changes(&self) -> watch::Receiver<BackendStatus> {
        self.status.subscribe()
    }

    /// Dial, handshake, and send the initial `TrackGame`.
    ///
    /// Returns the connection plus any records that arrived in the same
    /// frame as the handshake answer.
    async fn open(&self, url: &str) -> Result<(WebSocketConnection, Vec<Vec<u8>>), BackendError> {
        let conn = WebSocketConnection::connect(url).await?;
        conn.send_text(&hub::handshake_request()).await?;

        let frame = conn.recv().await?.ok_or(BackendError::HandshakeClosed)?;
        let mut records = hub::split_records(&frame);
        let answer = records.next().ok_or(BackendError::HandshakeClosed)?;
        hub::parse_handshake_response(answer)?;
        let leftover = records.map(<[u8]>::to_vec).collect();

        conn.send_text(&encode_track(&self.game_code)?).await?;
        Ok((conn, leftover))
    }
}

fn encode_track(game_code: &str) -> Result<String, BackendError> {
    Ok(hub::encode_invocation(
        TRACK_GAME,
        &[Value::from(game_code)],
    )?)
}

impl Backend for ImpostorBackend {
    async fn try_initialize(&mut self) -> Result<(), BackendError> {
        let current = *self.status.borrow();
        if matches!(current, BackendStatus::Connected | BackendStatus::Destroyed) {
            return Err(BackendError::AlreadyInitialized(current));
        }

        let url = self.hub_url();
        tracing::info!(%url, game_code = %self.game_code, "connecting to impostor hub");

        let (conn, leftover) = match self.open(&url).await {
            Ok(opened) => opened,
            Err(e) => {
                self.status.send_replace(BackendStatus::Failed);
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::channel(16);
        let pump = Pump {
            conn,
            commands: rx,
            events: self.events.clone(),
            moves: ThrottleMap::new(ThrottleConfig::from_millis(self.params.throttle_ms)),
            status: Arc::clone(&self.status),
            ping_interval: self.ping_interval,
        };
        self.status.send_replace(BackendStatus::Connected);
        let task = tokio::spawn(pump.run(leftover));
        self.pump = Some(PumpHandle { commands: tx, task });

        tracing::info!(game_code = %self.game_code, "tracking game");
        Ok(())
    }

    async fn destroy(&mut self) -> Result<(), BackendError> {
        match self.pump.take() {
            Some(pump) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                // A pump that already exited has nothing left to close.
                if pump
                    .commands
                    .send(PumpCommand::Close { reply: reply_tx })
                    .await
                    .is_ok()
                {
                    let _ = reply_rx.await;
                }
                if let Err(e) = pump.task.await {
                    tracing::warn!(error = %e, "impostor pump ended abnormally");
                }
            }
            None if *self.status.borrow() == BackendStatus::Idle => {
                return Err(BackendError::NotInitialized);
            }
            None => {}
        }
        self.status.send_replace(BackendStatus::Destroyed);
        tracing::info!(url = %self.hub_url(), "impostor backend destroyed");
        Ok(())
    }

    async fn track(&self, game_code: &str) -> Result<(), BackendError> {
        let Some(pump) = &self.pump else {
            return Err(match *self.status.borrow() {
                BackendStatus::Idle => BackendError::NotInitialized,
                _ => BackendError::Closed,
            });
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        pump.commands
            .send(PumpCommand::Track {
                game_code: game_code.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| BackendError::Closed)?;
        reply_rx.await.map_err(|_| BackendError::Closed)?
    }

    fn status(&self) -> BackendStatus {
        *self.status.borrow()
    }
}

// ---------------------------------------------------------------------------
// Pump task
// ---------------------------------------------------------------------------

struct Pump {
    conn: WebSocketConnection,
    commands: mpsc::Receiver<PumpCommand>,
    events: mpsc::Sender<BackendEvent>,
    moves: ThrottleMap<String, Pose>,
    status: Arc<watch::Sender<BackendStatus>>,
    ping_interval: Duration,
}

enum Exit {
    /// The hub went away or the socket failed.
    Lost(String),
    /// `destroy` asked us to stop.
    Close(Option<oneshot::Sender<()>>),
}

impl Pump {
    async fn run(mut self, leftover: Vec<Vec<u8>>) {
        let id = self.conn.id();
        tracing::debug!(%id, "impostor pump started");

        let mut early_exit = None;
        for record in &leftover {
            if let Some(exit) = self.handle_record(record).await {
                early_exit = Some(exit);
                break;
            }
        }

        let mut ping = time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = match early_exit {
            Some(exit) => exit,
            None => loop {
                tokio::select! {
                    frame = self.conn.recv() => match frame {
                        Ok(Some(frame)) => {
                            if let Some(exit) = self.handle_frame(&frame).await {
                                break exit;
                            }
                        }
                        Ok(None) => break Exit::Lost("closed by hub".into()),
                        Err(e) => break Exit::Lost(e.to_string()),
                    },
                    due = self.moves.wait_due() => {
                        for (name, pose) in due {
                            self.emit(BackendEvent::PlayerPose { name, pose }).await;
                        }
                    }
                    _ = ping.tick() => {
                        if let Err(e) = self.conn.send_text(&hub::encode_ping()).await {
                            break Exit::Lost(e.to_string());
                        }
                        tracing::trace!(%id, "ping sent");
                    }
                    cmd = self.commands.recv() => match cmd {
                        Some(PumpCommand::Track { game_code, reply }) => {
                            let _ = reply.send(self.send_track(&game_code).await);
                        }
                        Some(PumpCommand::Close { reply }) => break Exit::Close(Some(reply)),
                        None => break Exit::Close(None),
                    },
                }
            },
        };

        // The last known pose of every player still goes out.
        for (name, pose) in self.moves.flush() {
            self.emit(BackendEvent::PlayerPose { name, pose }).await;
        }

        match exit {
            Exit::Lost(reason) => {
                tracing::warn!(%id, %reason, "impostor hub connection lost");
                self.status.send_replace(BackendStatus::Failed);
            }
            Exit::Close(reply) => {
                if let Err(e) = self.conn.close().await {
                    tracing::debug!(%id, error = %e, "close handshake failed");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
        tracing::debug!(%id, "impostor pump stopped");
    }

    async fn handle_frame(&mut self, frame: &[u8]) -> Option<Exit> {
        for record in hub::split_records(frame) {
            if let Some(exit) = self.handle_record(record).await {
                return Some(exit);
            }
        }
        None
    }

    async fn handle_record(&mut self, record: &[u8]) -> Option<Exit> {
        match hub::parse_record(record) {
            Ok(HubMessage::Invocation { target, arguments }) => {
                self.handle_invocation(&target, arguments).await;
            }
            Ok(HubMessage::Ping) => tracing::trace!("hub ping"),
            Ok(HubMessage::Close { error }) => {
                return Some(Exit::Lost(
                    error.unwrap_or_else(|| "closed by hub".to_string()),
                ));
            }
            Ok(HubMessage::Other(kind)) => tracing::trace!(kind, "ignoring hub message"),
            Err(e) => tracing::warn!(error = %e, "malformed hub record"),
        }
        None
    }

    async fn handle_invocation(&mut self, target: &str, arguments: Vec<Value>) {
        let event = match ImpostorEvent::from_invocation(target, arguments) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(invocation = target, error = %e, "rejected hub event");
                return;
            }
        };

        match event {
            ImpostorEvent::PlayerMove { name, pose } => {
                match self.moves.offer(Instant::now(), name.clone(), pose) {
                    Offer::Immediate(pose) => {
                        self.emit(BackendEvent::PlayerPose { name, pose }).await;
                    }
                    Offer::Scheduled { .. } | Offer::Coalesced => {}
                }
            }
            // Pending moves stay pending and are delivered when their
            // window closes, even if that is after a meeting collapse.
            event => self.emit(event.translate()).await,
        }
    }

    async fn send_track(&self, game_code: &str) -> Result<(), BackendError> {
        self.conn.send_text(&encode_track(game_code)?).await?;
        tracing::info!(%game_code, "tracking game");
        Ok(())
    }

    async fn emit(&self, event: BackendEvent) {
        tracing::trace!(?event, "backend event");
        if self.events.send(event).await.is_err() {
            tracing::debug!("backend event receiver dropped");
        }
    }
}
