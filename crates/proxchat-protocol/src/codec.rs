//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The layers above never call `serde_json` directly; they hold something
//! that implements [`Codec`]. [`JsonCodec`] is the only implementation today
//! and matches what the relay hub speaks.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ProtocolError, RoomEvent};

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec is stored inside long-lived
/// connection tasks that Tokio may move between worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a relay-hub event and runs its semantic checks.
    ///
    /// Anything that fails here, whether at the JSON level or because of a
    /// non-finite pose, comes back as `ProtocolError::InvalidEventData`, so
    /// callers have one error to reject on.
    fn decode_event(&self, data: &[u8]) -> Result<RoomEvent, ProtocolError> {
        let event: RoomEvent = self
            .decode(data)
            .map_err(|e| ProtocolError::InvalidEventData(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use proxchat_protocol::{ClientId, Codec, JsonCodec, Pose, RoomEvent};
///
/// let codec = JsonCodec;
/// let event = RoomEvent::SetPose {
///     uuid: ClientId::new("4f1c"),
///     pose: Pose::new(1.0, 2.0),
/// };
///
/// let bytes = codec.encode(&event).unwrap();
/// let decoded = codec.decode_event(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
