//! Session lifecycle for proxchat.
//!
//! This crate decides what a transport-level event *means* for the room:
//!
//! 1. **State** — [`SessionState`]: disconnected, connecting, joined
//! 2. **Input** — [`SessionSignal`]: connect, error, close, uuid, join ack
//! 3. **Output** — [`SessionEffect`]: currently only "reset the room"
//!
//! # How it fits in the stack
//!
//! ```text
//! Client loop (above)   ← feeds transport/hub signals, performs effects
//!     ↕
//! Session Layer (this crate)  ← pure state machine, no I/O
//!     ↕
//! Protocol Layer (below)  ← provides ClientId
//! ```

mod controller;
mod error;
mod session;

pub use controller::SessionController;
pub use error::SessionError;
pub use session::{SessionEffect, SessionSignal, SessionState};
