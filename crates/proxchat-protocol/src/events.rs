//! Event vocabularies flowing between the layers.
//!
//! ```text
//!  relay hub ──RoomEvent──▶ room store ◀──BackendEvent── backend adapter
//!      ▲                                                       │
//!      └──────────ClientIntent                 "track game" ───┘ (upstream)
//! ```
//!
//! - [`RoomEvent`] is what the relay hub pushes to a connected client. It is
//!   keyed by client uuid and travels as internally tagged JSON.
//! - [`BackendEvent`] is the normalized output of a game backend adapter.
//!   Backends only know in-game player names, so these are keyed by name and
//!   resolved against the store's roster when applied.
//! - [`ClientIntent`] is what the client sends back to the relay hub.

use serde::{Deserialize, Serialize};

use crate::{
    BackendModel, ClientId, ClientRecord, HostOptions, MapId, Pose,
    ProtocolError, RoomGroup,
};

// ---------------------------------------------------------------------------
// RoomEvent — relay hub → client
// ---------------------------------------------------------------------------

/// An inbound room-state event from the relay hub.
///
/// `#[serde(tag = "type")]` puts the variant name next to the fields:
///
/// ```json
/// { "type": "SetPose", "uuid": "4f1c…", "pose": { "x": 1.5, "y": -2.0 } }
/// ```
///
/// `AddClient` carries the record's fields inline, the same shape the hub
/// uses for a client anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RoomEvent {
    /// The hub assigned this client its identity.
    SetUuid { uuid: ClientId },

    /// A peer joined the room.
    AddClient(ClientRecord),

    /// Full resync: the complete peer list replaces the current one.
    SetAllClients { clients: Vec<ClientRecord> },

    /// A peer left the room.
    RemoveClient { uuid: ClientId },

    /// Someone's pose changed. May target the local client.
    SetPose { uuid: ClientId, pose: Pose },

    /// Someone's group changed. May target the local client.
    SetGroup { uuid: ClientId, group: RoomGroup },

    /// The hub acknowledged (or revoked) room membership.
    SetJoinedRoom { joined: bool },

    /// The hub confirmed the display name and backend for this client.
    SetNameAndBackendModel {
        name: String,
        backend_model: BackendModel,
    },

    /// Whether this client is the room host.
    SetHost { is_host: bool },

    /// The host changed the audio options.
    SetOptions { options: HostOptions },
}

impl RoomEvent {
    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetUuid { .. } => "SetUuid",
            Self::AddClient(_) => "AddClient",
            Self::SetAllClients { .. } => "SetAllClients",
            Self::RemoveClient { .. } => "RemoveClient",
            Self::SetPose { .. } => "SetPose",
            Self::SetGroup { .. } => "SetGroup",
            Self::SetJoinedRoom { .. } => "SetJoinedRoom",
            Self::SetNameAndBackendModel { .. } => "SetNameAndBackendModel",
            Self::SetHost { .. } => "SetHost",
            Self::SetOptions { .. } => "SetOptions",
        }
    }

    /// Validates what deserialization alone can't: pose coordinates must
    /// be finite wherever a pose appears.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::AddClient(client) => client.validate(),
            Self::SetAllClients { clients } => {
                clients.iter().try_for_each(ClientRecord::validate)
            }
            Self::SetPose { pose, .. } => pose.validate().map(|_| ()),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// BackendEvent — adapter → room store
// ---------------------------------------------------------------------------

/// Normalized output of a game backend adapter.
///
/// Every adapter, whatever its native vocabulary, translates into this set.
/// Bulk variants ("all players", "everyone in group X") are expanded by the
/// room store against its current roster, in the same turn that applies
/// them.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The game switched maps. Passed through, no state change.
    MapChange(MapId),

    /// One player moved.
    PlayerPose { name: String, pose: Pose },

    /// Every tracked client (local one included) gets the same pose.
    AllPlayerPoses(Pose),

    /// One player moves to a group.
    PlayerJoinGroup { name: String, group: RoomGroup },

    /// Every tracked client (local one included) moves to a group.
    AllPlayersJoinGroup(RoomGroup),

    /// Every client currently in `from` moves to `to`. Clients in other
    /// groups are left alone.
    PlayersFromGroup { from: RoomGroup, to: RoomGroup },
}

// ---------------------------------------------------------------------------
// ClientIntent — client → relay hub
// ---------------------------------------------------------------------------

/// An outbound request from this client to the relay hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    /// Join the room for `backend_model.game_code` under a display name.
    JoinRoom {
        name: String,
        backend_model: BackendModel,
    },

    /// Leave the current room.
    LeaveRoom,
}
