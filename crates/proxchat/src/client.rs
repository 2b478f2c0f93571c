//! `RelayClient` builder and run loop.
//!
//! This is the entry point for a proxchat client. It ties the layers
//! together: transport → protocol → session → room store, with an optional
//! game backend feeding the same store.

use std::future::Future;
use std::time::Duration;

use proxchat_backend::{Backend, BackendAdapter, BackendError, BackendStatus};
use proxchat_protocol::{BackendEvent, BackendModel, ClientIntent, JsonCodec, RoomEvent};
use proxchat_room::{RoomError, RoomStoreHandle, StoreConfig, spawn_store};
use proxchat_session::{SessionSignal, SessionState};
use proxchat_transport::{Connection, ConnectionId, Connector, WebSocketConnection, WebSocketConnector};
use tokio::sync::{mpsc, watch};

use crate::ProxchatError;
use crate::handler::{self, Ended, SessionLink};

/// How long to wait for the relay hub before giving up, unless configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend events that may queue between an adapter and the store.
const BACKEND_EVENT_BUFFER: usize = 256;

/// Builder for configuring and connecting a relay client.
///
/// # Example
///
/// ```rust,ignore
/// use proxchat::prelude::*;
///
/// let client = RelayClient::builder("ws://127.0.0.1:8080/ws")
///     .name("red")
///     .backend_model(model)
///     .connect()
///     .await?;
/// client.run().await
/// ```
pub struct RelayClientBuilder {
    hub_url: String,
    name: String,
    backend_model: BackendModel,
    store_config: StoreConfig,
    connect_timeout: Option<Duration>,
}

impl RelayClientBuilder {
    /// Creates a builder for the relay hub at `hub_url`.
    pub fn new(hub_url: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            name: String::new(),
            backend_model: BackendModel::default(),
            store_config: StoreConfig::default(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// The display name to join under. Must match the in-game name for a
    /// backend to find this client.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Which room (game code) to join and which backend drives it.
    pub fn backend_model(mut self, model: BackendModel) -> Self {
        self.backend_model = model;
        self
    }

    /// Bounded size of the store actor's command queue.
    pub fn command_buffer(mut self, size: usize) -> Self {
        self.store_config.command_buffer = size;
        self
    }

    /// Upper bound on connecting to the relay hub. `None` waits for as
    /// long as the OS does.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Spawns the room store, connects to the relay hub, and asks to join.
    ///
    /// Uses `JsonCodec` and `WebSocketConnector`.
    ///
    /// # Errors
    /// A transport error if the hub can't be reached; the store is shut
    /// down again in that case.
    pub async fn connect(self) -> Result<RelayClient, ProxchatError> {
        let store = spawn_store(self.store_config);
        let mut session = SessionLink::new();
        session.signal(SessionSignal::Connect);

        let connector = match self.connect_timeout {
            Some(limit) => WebSocketConnector::with_timeout(limit),
            None => WebSocketConnector::new(),
        };
        tracing::info!(url = %self.hub_url, name = %self.name, "connecting to relay hub");

        let conn = match connector.connect(&self.hub_url).await {
            Ok(conn) => conn,
            Err(e) => {
                handler::signal_and_apply(&mut session, &store, SessionSignal::Error(e.to_string()))
                    .await?;
                let _ = store.shutdown().await;
                return Err(e.into());
            }
        };

        let client = RelayClient {
            conn,
            codec: JsonCodec,
            store,
            session,
            backend: None,
        };
        client.join(self.name, self.backend_model).await?;
        Ok(client)
    }
}

/// A client connected to the relay hub.
///
/// Call [`run()`](Self::run) to start applying room events.
pub struct RelayClient {
    conn: WebSocketConnection,
    codec: JsonCodec,
    store: RoomStoreHandle,
    session: SessionLink,
    backend: Option<BackendAdapter>,
}

impl RelayClient {
    /// Creates a new builder.
    pub fn builder(hub_url: impl Into<String>) -> RelayClientBuilder {
        RelayClientBuilder::new(hub_url)
    }

    /// Handle to the room store. Clone it before `run` to keep reading.
    pub fn store(&self) -> &RoomStoreHandle {
        &self.store
    }

    /// A receiver woken on every session state change.
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Status of the attached backend, if one is attached.
    pub fn backend_status(&self) -> Option<BackendStatus> {
        self.backend.as_ref().map(Backend::status)
    }

    async fn join(&self, name: String, backend_model: BackendModel) -> Result<(), ProxchatError> {
        let game_code = backend_model.game_code.clone();
        self.store
            .dispatch(RoomEvent::SetNameAndBackendModel {
                name: name.clone(),
                backend_model: backend_model.clone(),
            })
            .await?;
        handler::send_intent(
            &self.conn,
            &self.codec,
            &ClientIntent::JoinRoom {
                name,
                backend_model,
            },
        )
        .await?;
        tracing::info!(%game_code, "join requested");
        Ok(())
    }

    /// Builds and initializes a backend adapter whose events feed this
    /// client's store. Replaces (and destroys) any adapter attached before.
    ///
    /// A backend that fails to connect is still attached, in status
    /// [`BackendStatus::Failed`]; the returned status says which.
    pub async fn attach_backend(&mut self, model: &BackendModel) -> BackendStatus {
        self.detach_backend().await;

        let (tx, rx) = mpsc::channel(BACKEND_EVENT_BUFFER);
        tokio::spawn(forward_backend_events(rx, self.store.clone()));

        let mut adapter = BackendAdapter::from_model(model, tx);
        adapter.initialize().await;
        let status = adapter.status();
        tracing::info!(backend_type = %adapter.backend_type(), %status, "backend attached");
        self.backend = Some(adapter);
        status
    }

    /// Asks the attached backend to follow another game.
    ///
    /// # Errors
    /// [`BackendError::NotInitialized`] if no backend is attached.
    pub async fn track(&self, game_code: &str) -> Result<(), ProxchatError> {
        let backend = self.backend.as_ref().ok_or(BackendError::NotInitialized)?;
        backend.track(game_code).await?;
        Ok(())
    }

    async fn detach_backend(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.destroy().await {
                tracing::debug!(error = %e, "backend destroy failed");
            }
        }
    }

    /// Applies relay hub events until the hub closes the connection or the
    /// transport fails, then resets the room.
    pub async fn run(self) -> Result<(), ProxchatError> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` completes.
    /// Stopping that way sends `LeaveRoom` and closes the connection first.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ProxchatError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(conn_id = %self.conn.id(), "relay client running");
        tokio::pin!(shutdown);

        let ended = tokio::select! {
            ended = handler::pump_relay(&self.conn, &self.codec, &self.store, &mut self.session) => ended,
            () = &mut shutdown => Ok(Ended::Left),
        };

        if matches!(ended, Ok(Ended::Left)) {
            self.leave().await;
        }

        self.detach_backend().await;
        let ended = ended?;
        handler::signal_and_apply(&mut self.session, &self.store, ended.into_signal()).await?;
        Ok(())
    }

    async fn leave(&self) {
        if let Err(e) = handler::send_intent(&self.conn, &self.codec, &ClientIntent::LeaveRoom).await {
            tracing::debug!(error = %e, "leave intent not sent");
        }
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "close failed");
        }
    }
}

/// Moves adapter output into the store until either side goes away.
async fn forward_backend_events(mut rx: mpsc::Receiver<BackendEvent>, store: RoomStoreHandle) {
    while let Some(event) = rx.recv().await {
        if let Err(RoomError::Unavailable) = store.push_backend(event).await {
            break;
        }
    }
    tracing::debug!("backend event forwarding stopped");
}
