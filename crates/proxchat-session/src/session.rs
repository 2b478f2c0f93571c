//! Session types: the state machine vocabulary.
//!
//! A session is one client's connection to the relay hub, from the first
//! connection attempt until the transport reports an error or a close.

use std::fmt;

use proxchat_protocol::ClientId;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///                connect              joined(true)
/// Disconnected ─────────▶ Connecting ─────────────▶ Joined
///      ▲                      ▲                       │
///      │                      └──── joined(false) ────┤
///      └─────────────── error / close ────────────────┘
/// ```
///
/// An error or close from *any* state lands in `Disconnected` and asks for
/// a room reset. There is no automatic way back out of `Disconnected`;
/// reconnecting is the caller's decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// The transport is up (or coming up); the hub hasn't confirmed the join.
    Connecting,
    /// The hub confirmed room membership.
    Joined,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Joined => write!(f, "joined"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSignal
// ---------------------------------------------------------------------------

/// Something the transport or the hub told us.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    /// A connection attempt started.
    Connect,
    /// The transport failed.
    Error(String),
    /// The transport closed.
    Disconnect(String),
    /// The hub assigned this client an identity.
    UuidAssigned(ClientId),
    /// The hub acknowledged (`true`) or revoked (`false`) room membership.
    JoinedRoom(bool),
}

// ---------------------------------------------------------------------------
// SessionEffect
// ---------------------------------------------------------------------------

/// Work the caller must do as a result of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Run the room reset sequence.
    ResetRoom,
}
