//! Room state store for proxchat.
//!
//! One [`RoomState`] per connected client: the local player, its peers, and
//! room metadata. It changes only through named [`Transition`]s, applied by
//! the [`RoomStore`] dispatcher, which is in turn owned by a single-writer
//! actor ([`spawn_store`]).
//!
//! # Key types
//!
//! - [`RoomState`] — the aggregate and its invariants
//! - [`Transition`] — the fixed set of mutations
//! - [`RoomStore`] — routes relay-hub and backend events into transitions
//! - [`RoomStoreHandle`] — talk to a running store actor
//! - [`RoomNotification`] — what changed, fanned out to subscribers

mod actor;
mod error;
mod state;
mod store;

pub use actor::{RoomStoreHandle, StoreConfig, spawn_store, spawn_store_with};
pub use error::RoomError;
pub use state::{Metadata, RoomNotification, RoomState, Transition};
pub use store::RoomStore;
