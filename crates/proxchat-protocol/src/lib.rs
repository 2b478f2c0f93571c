//! Shared data contracts for proxchat.
//!
//! - **Types** ([`Pose`], [`RoomGroup`], [`ClientRecord`], [`BackendModel`],
//!   [`HostOptions`]) — the pose & group model every layer reads and writes.
//! - **Events** ([`RoomEvent`], [`BackendEvent`], [`ClientIntent`]) — the
//!   vocabularies exchanged between relay hub, adapters, and the room store.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (RoomEvent / BackendEvent) → Room store
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{BackendEvent, ClientIntent, RoomEvent};
pub use types::{
    BackendModel, BackendParams, BackendType, ClientId, ClientRecord,
    DEFAULT_MOVE_THROTTLE_MS, HostOptions, ImpostorParams, MapId, Pose,
    RoomGroup,
};
