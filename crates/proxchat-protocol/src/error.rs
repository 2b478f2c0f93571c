//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An upstream payload was malformed or outside the known vocabulary:
    /// wrong arity, wrong JSON type, unknown group or event name, or a
    /// non-finite pose.
    ///
    /// Rejected at the boundary where it was received. Never fatal, never
    /// applied to the room store.
    #[error("invalid event data: {0}")]
    InvalidEventData(String),
}
