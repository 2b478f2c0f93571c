//! Error types for the backend layer.

use proxchat_protocol::ProtocolError;
use proxchat_transport::TransportError;

/// Errors a backend adapter can report.
///
/// [`BackendAdapter::initialize`](crate::BackendAdapter::initialize) logs
/// these instead of returning them; the `try_` variants hand them back.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The upstream connection couldn't be opened or was lost.
    #[error("backend connection failed: {0}")]
    Connection(#[from] TransportError),

    /// The upstream spoke something we don't understand during setup.
    #[error("backend protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The upstream closed the connection before the handshake finished.
    #[error("backend closed the connection during handshake")]
    HandshakeClosed,

    /// `destroy` or `track` before `initialize` was ever attempted.
    #[error("backend was never initialized")]
    NotInitialized,

    /// `initialize` on an adapter that is already connected or destroyed.
    #[error("backend is already {0}")]
    AlreadyInitialized(crate::BackendStatus),

    /// The upstream connection is gone; the adapter is alive but idle.
    #[error("backend connection is closed")]
    Closed,
}
