//! Error types for the session layer.

use crate::SessionState;

/// A signal that doesn't make sense in the current state.
///
/// These are never fatal. [`SessionController::handle`](crate::SessionController::handle)
/// logs them and leaves the state unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The hub acknowledged a join, but no connection is in progress.
    /// Usually a late event from a connection that was already torn down.
    #[error("join acknowledged while {0}")]
    NotConnected(SessionState),

    /// A new connection attempt started while one is already live.
    #[error("connect requested while {0}")]
    AlreadyConnected(SessionState),
}
