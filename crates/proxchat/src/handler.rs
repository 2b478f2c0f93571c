//! Relay hub connection loop: decode, signal, dispatch.
//!
//! The flow for every inbound frame is:
//!   1. Decode a `RoomEvent` (malformed frames are logged and skipped)
//!   2. Feed identity and membership events to the session controller
//!   3. Dispatch the event to the room store actor
//!
//! The loop ends when the hub closes the socket or the transport fails.
//! What that means for the room is the session controller's call.

use proxchat_protocol::{ClientIntent, Codec, RoomEvent};
use proxchat_room::{RoomError, RoomStoreHandle};
use proxchat_session::{SessionController, SessionEffect, SessionSignal, SessionState};
use proxchat_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::watch;

use crate::ProxchatError;

/// Why a relay connection stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Ended {
    /// The hub closed the socket.
    Closed(String),
    /// Receiving failed.
    Failed(String),
    /// We left on purpose.
    Left,
}

impl Ended {
    pub(crate) fn into_signal(self) -> SessionSignal {
        match self {
            Self::Closed(reason) => SessionSignal::Disconnect(reason),
            Self::Failed(reason) => SessionSignal::Error(reason),
            Self::Left => SessionSignal::Disconnect("left room".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionLink
// ---------------------------------------------------------------------------

/// A [`SessionController`] that publishes every state it lands in.
pub(crate) struct SessionLink {
    controller: SessionController,
    state: watch::Sender<SessionState>,
}

impl SessionLink {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            controller: SessionController::new(),
            state,
        }
    }

    pub(crate) fn signal(&mut self, signal: SessionSignal) -> Option<SessionEffect> {
        let effect = self.controller.handle(signal);
        self.state.send_replace(self.controller.state());
        effect
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn state(&self) -> SessionState {
        self.controller.state()
    }
}

/// Runs `signal` and carries out whatever effect it asks for.
pub(crate) async fn signal_and_apply(
    session: &mut SessionLink,
    store: &RoomStoreHandle,
    signal: SessionSignal,
) -> Result<(), RoomError> {
    match session.signal(signal) {
        Some(SessionEffect::ResetRoom) => store.reset().await,
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Reads the relay hub until the connection ends.
///
/// # Errors
/// Only [`RoomError::Unavailable`]: the store actor is gone, so there is
/// nothing left to dispatch into. Rejected events are logged by the store
/// and do not stop the loop.
pub(crate) async fn pump_relay<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    store: &RoomStoreHandle,
    session: &mut SessionLink,
) -> Result<Ended, RoomError> {
    let conn_id = conn.id();

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "relay hub closed the connection");
                return Ok(Ended::Closed("closed by relay hub".into()));
            }
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "relay hub connection failed");
                return Ok(Ended::Failed(e.to_string()));
            }
        };

        let event = match codec.decode_event(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode relay event");
                continue;
            }
        };
        tracing::trace!(%conn_id, kind = event.kind(), "relay event");

        match &event {
            RoomEvent::SetUuid { uuid } => {
                session.signal(SessionSignal::UuidAssigned(uuid.clone()));
            }
            RoomEvent::SetJoinedRoom { joined } => {
                session.signal(SessionSignal::JoinedRoom(*joined));
            }
            _ => {}
        }

        match store.dispatch(event).await {
            Ok(()) => {}
            Err(RoomError::Unavailable) => return Err(RoomError::Unavailable),
            // Already logged by the store.
            Err(_) => {}
        }
    }
}

/// Encodes and sends an intent to the relay hub.
///
/// Text frames when the codec produced UTF-8, binary otherwise.
pub(crate) async fn send_intent<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    intent: &ClientIntent,
) -> Result<(), ProxchatError> {
    let bytes = codec.encode(intent)?;
    let sent: Result<(), TransportError> = match std::str::from_utf8(&bytes) {
        Ok(text) => conn.send_text(text).await,
        Err(_) => conn.send(&bytes).await,
    };
    sent?;
    Ok(())
}
