//! Error types for the room layer.

use proxchat_protocol::ClientId;

/// Errors that can occur while applying events to the room store.
///
/// None of these are fatal. The store actor logs them and drops the
/// offending event; the state is left exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A pose or group update named a peer uuid the store doesn't know.
    #[error("no client with uuid {0}")]
    UnknownClient(ClientId),

    /// A backend event named a player that matches neither the local
    /// client nor any peer.
    #[error("no client named {0:?}")]
    UnknownPlayer(String),

    /// The hub announced a peer that is already in the roster.
    #[error("client {0} is already in the room")]
    DuplicateClient(ClientId),

    /// The hub announced the local client as a peer.
    #[error("client {0} is the local client")]
    LocalClient(ClientId),

    /// The store actor has stopped.
    #[error("room store is unavailable")]
    Unavailable,
}
