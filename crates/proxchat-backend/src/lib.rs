//! Game backend adapters for proxchat.
//!
//! A backend watches a running game and reports, in game terms, who moved
//! where and who should hear whom. Every adapter translates its native
//! vocabulary into [`BackendEvent`](proxchat_protocol::BackendEvent)s and
//! pushes them into an mpsc channel; the room store resolves them against
//! its roster.
//!
//! - [`Backend`] — the capability contract (`initialize`, `destroy`, `track`)
//! - [`BackendAdapter`] — one variant per `backendType`
//! - [`ImpostorBackend`] — Impostor servers with the event hub plugin
//! - [`NoOpBackend`] — rooms with no game attached
//! - [`hub`] — record framing for the Impostor event hub

#![allow(async_fn_in_trait)]

mod adapter;
mod error;
pub mod hub;
mod impostor;
mod noop;
mod translate;

pub use adapter::{Backend, BackendAdapter, BackendStatus};
pub use error::BackendError;
pub use impostor::{IMPOSTOR_BACKEND_PORT, ImpostorBackend, PING_INTERVAL};
pub use noop::NoOpBackend;
pub use translate::{ImpostorEvent, TRACK_GAME};
