//! # proxchat
//!
//! Room group and pose state for proximity voice chat.
//!
//! A relay hub tells each client who is in the room; a game backend tells
//! it where everyone stands and who should hear whom. proxchat keeps one
//! [`RoomState`](proxchat_room::RoomState) per client, fed by both, and
//! publishes every change to whatever renders audio.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proxchat::prelude::*;
//!
//! # async fn demo() -> Result<(), ProxchatError> {
//! let model = BackendModel::new(
//!     "ABCDEF",
//!     BackendParams::Impostor(ImpostorParams::new("10.0.0.2")),
//! );
//! let mut client = RelayClient::builder("ws://127.0.0.1:8080/ws")
//!     .name("red")
//!     .backend_model(model.clone())
//!     .connect()
//!     .await?;
//! client.attach_backend(&model).await;
//!
//! let mut changes = client.store().subscribe();
//! tokio::spawn(async move {
//!     while let Ok(change) = changes.recv().await {
//!         println!("{change:?}");
//!     }
//! });
//! client.run().await
//! # }
//! ```

mod client;
mod error;
mod handler;
pub mod telemetry;

pub use client::{DEFAULT_CONNECT_TIMEOUT, RelayClient, RelayClientBuilder};
pub use error::ProxchatError;

/// Everything needed to connect a client and read its room.
pub mod prelude {
    pub use crate::{ProxchatError, RelayClient, RelayClientBuilder};

    pub use proxchat_backend::{Backend, BackendAdapter, BackendError, BackendStatus};
    pub use proxchat_protocol::{
        BackendEvent, BackendModel, BackendParams, BackendType, ClientId, ClientRecord,
        DEFAULT_MOVE_THROTTLE_MS, HostOptions, ImpostorParams, MapId, Pose, RoomEvent, RoomGroup,
    };
    pub use proxchat_room::{
        Metadata, RoomError, RoomNotification, RoomState, RoomStoreHandle, StoreConfig,
    };
    pub use proxchat_session::SessionState;
    pub use proxchat_throttle::ThrottleConfig;
}
