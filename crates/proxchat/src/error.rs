//! Unified error type for proxchat.

use proxchat_backend::BackendError;
use proxchat_protocol::ProtocolError;
use proxchat_room::RoomError;
use proxchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `proxchat` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
#[derive(Debug, thiserror::Error)]
pub enum ProxchatError {
    /// The relay hub connection couldn't be opened or failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room store rejected an update or has stopped.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A game backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use proxchat_protocol::ClientId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let proxchat_err: ProxchatError = err.into();
        assert!(matches!(proxchat_err, ProxchatError::Transport(_)));
        assert!(proxchat_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidEventData("bad pose".into());
        let proxchat_err: ProxchatError = err.into();
        assert!(matches!(proxchat_err, ProxchatError::Protocol(_)));
        assert!(proxchat_err.to_string().contains("bad pose"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::UnknownClient(ClientId::new("ghost"));
        let proxchat_err: ProxchatError = err.into();
        assert!(matches!(proxchat_err, ProxchatError::Room(_)));
        assert!(proxchat_err.to_string().contains("ghost"));
    }

    #[test]
    fn test_from_backend_error() {
        let proxchat_err: ProxchatError = BackendError::NotInitialized.into();
        assert!(matches!(proxchat_err, ProxchatError::Backend(_)));
    }
}
