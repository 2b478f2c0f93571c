//! The room state aggregate and the named transitions that mutate it.
//!
//! [`RoomState`] is never written field by field from outside this module.
//! Every change goes through [`RoomState::apply`] with a [`Transition`], and
//! every applied transition reports what it changed as a
//! [`RoomNotification`].

use proxchat_protocol::{
    BackendModel, ClientId, ClientRecord, HostOptions, MapId, Pose, RoomGroup,
};
use serde::Serialize;

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// Everything one connected client knows about its room.
///
/// Invariants, held by the dispatcher in [`RoomStore`](crate::RoomStore):
///
/// - `clients` never contains an entry whose uuid equals `me.uuid`.
/// - uuids in `clients` are unique.
///
/// `apply` alone does not enforce them: `AddClient` appends without
/// checking, like the transition it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub joined_room: bool,
    pub backend_model: BackendModel,
    pub me: ClientRecord,
    /// Peers, in the order the hub announced them.
    pub clients: Vec<ClientRecord>,
    pub options: HostOptions,
    pub is_host: bool,
}

impl RoomState {
    /// Looks up a peer by uuid.
    pub fn client(&self, uuid: &ClientId) -> Option<&ClientRecord> {
        self.clients.iter().find(|c| &c.uuid == uuid)
    }

    /// Whether a peer with this uuid is in the roster.
    pub fn has_client(&self, uuid: &ClientId) -> bool {
        self.client(uuid).is_some()
    }

    /// Whether `uuid` identifies the local client.
    pub fn is_me(&self, uuid: &ClientId) -> bool {
        &self.me.uuid == uuid
    }

    /// The local client followed by every peer.
    pub fn everyone(&self) -> impl Iterator<Item = &ClientRecord> {
        std::iter::once(&self.me).chain(self.clients.iter())
    }

    /// Group of the local client or a peer.
    pub fn group_of(&self, uuid: &ClientId) -> Option<RoomGroup> {
        self.everyone().find(|c| &c.uuid == uuid).map(|c| c.group)
    }

    /// Applies one transition.
    ///
    /// Returns the resulting notification, or `None` when the transition
    /// was a no-op (`RemoveClient` for an absent uuid).
    ///
    /// # Errors
    /// `SetPoseOf` and `SetGroupOf` for a uuid that is not a peer return
    /// [`RoomError::UnknownClient`] and leave the state untouched.
    pub fn apply(
        &mut self,
        transition: Transition,
    ) -> Result<Option<RoomNotification>, RoomError> {
        let note = match transition {
            Transition::SetUuid(uuid) => {
                self.me.uuid = uuid;
                RoomNotification::MetadataChanged(Metadata::Uuid)
            }
            Transition::AddClient(record) => {
                self.clients.push(record);
                self.membership()
            }
            Transition::SetAllClients(records) => {
                self.clients = records;
                self.membership()
            }
            Transition::RemoveClient(uuid) => {
                let before = self.clients.len();
                self.clients.retain(|c| c.uuid != uuid);
                if self.clients.len() == before {
                    return Ok(None);
                }
                self.membership()
            }
            Transition::SetPose(pose) => {
                self.me.pose = pose;
                RoomNotification::PoseChanged {
                    uuid: self.me.uuid.clone(),
                    pose,
                    local: true,
                }
            }
            Transition::SetPoseOf(uuid, pose) => {
                self.peer_mut(&uuid)?.pose = pose;
                RoomNotification::PoseChanged {
                    uuid,
                    pose,
                    local: false,
                }
            }
            Transition::SetGroup(group) => {
                self.me.group = group;
                RoomNotification::GroupChanged {
                    uuid: self.me.uuid.clone(),
                    group,
                    local: true,
                }
            }
            Transition::SetGroupOf(uuid, group) => {
                self.peer_mut(&uuid)?.group = group;
                RoomNotification::GroupChanged {
                    uuid,
                    group,
                    local: false,
                }
            }
            Transition::SetJoinedRoom(joined) => {
                self.joined_room = joined;
                RoomNotification::MetadataChanged(Metadata::JoinedRoom)
            }
            Transition::SetHost(is_host) => {
                self.is_host = is_host;
                RoomNotification::MetadataChanged(Metadata::Host)
            }
            Transition::SetOptions(options) => {
                self.options = options;
                RoomNotification::MetadataChanged(Metadata::Options)
            }
            Transition::SetNameAndBackendModel {
                name,
                backend_model,
            } => {
                self.me.name = name;
                self.backend_model = backend_model;
                RoomNotification::MetadataChanged(Metadata::NameAndBackendModel)
            }
        };
        Ok(Some(note))
    }

    fn peer_mut(&mut self, uuid: &ClientId) -> Result<&mut ClientRecord, RoomError> {
        self.clients
            .iter_mut()
            .find(|c| &c.uuid == uuid)
            .ok_or_else(|| RoomError::UnknownClient(uuid.clone()))
    }

    fn membership(&self) -> RoomNotification {
        RoomNotification::MembershipChanged {
            peers: self.clients.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// The fixed set of named mutations of [`RoomState`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    SetUuid(ClientId),
    /// Appends a peer. Does not deduplicate.
    AddClient(ClientRecord),
    /// Replaces the whole peer list.
    SetAllClients(Vec<ClientRecord>),
    /// Removes a peer. No-op if absent.
    RemoveClient(ClientId),
    /// Pose of the local client.
    SetPose(Pose),
    /// Pose of a peer.
    SetPoseOf(ClientId, Pose),
    /// Group of the local client.
    SetGroup(RoomGroup),
    /// Group of a peer.
    SetGroupOf(ClientId, RoomGroup),
    SetJoinedRoom(bool),
    SetHost(bool),
    SetOptions(HostOptions),
    SetNameAndBackendModel {
        name: String,
        backend_model: BackendModel,
    },
}

impl Transition {
    /// The three transitions that return a session to "not connected".
    pub fn reset_sequence() -> [Transition; 3] {
        [
            Transition::SetUuid(ClientId::default()),
            Transition::SetJoinedRoom(false),
            Transition::SetNameAndBackendModel {
                name: String::new(),
                backend_model: BackendModel::default(),
            },
        ]
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Which piece of room metadata changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metadata {
    Uuid,
    JoinedRoom,
    Host,
    Options,
    NameAndBackendModel,
}

/// What changed, for the audio layer and anything else watching the room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomNotification {
    PoseChanged {
        uuid: ClientId,
        pose: Pose,
        /// `true` when the local client moved.
        local: bool,
    },
    GroupChanged {
        uuid: ClientId,
        group: RoomGroup,
        local: bool,
    },
    /// The peer list changed; `peers` is its new length.
    MembershipChanged { peers: usize },
    /// The backend reported a map change. Nothing in the state changed.
    MapChanged(MapId),
    MetadataChanged(Metadata),
    /// The session dropped and the room was reset.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_peers() -> RoomState {
        let mut s = RoomState::default();
        s.me = ClientRecord::new("me", "red");
        s.clients = vec![ClientRecord::new("a", "blue"), ClientRecord::new("b", "green")];
        s
    }

    #[test]
    fn test_default_matches_fresh_session() {
        let s = RoomState::default();
        assert!(!s.joined_room);
        assert!(s.me.uuid.is_empty());
        assert_eq!(s.me.group, RoomGroup::Spectator);
        assert_eq!(s.me.pose, Pose::ORIGIN);
        assert!(s.clients.is_empty());
        assert_eq!(s.options.falloff, 3.6);
        assert!(!s.is_host);
    }

    #[test]
    fn test_add_client_appends_without_dedup() {
        let mut s = state_with_peers();
        s.apply(Transition::AddClient(ClientRecord::new("a", "blue")))
            .unwrap();
        assert_eq!(s.clients.len(), 3);
    }

    #[test]
    fn test_remove_absent_client_is_noop() {
        let mut s = state_with_peers();
        let before = s.clone();
        let note = s.apply(Transition::RemoveClient(ClientId::new("zz"))).unwrap();
        assert!(note.is_none());
        assert_eq!(s, before);
    }

    #[test]
    fn test_remove_client_reports_membership() {
        let mut s = state_with_peers();
        let note = s.apply(Transition::RemoveClient(ClientId::new("a"))).unwrap();
        assert_eq!(note, Some(RoomNotification::MembershipChanged { peers: 1 }));
        assert!(!s.has_client(&ClientId::new("a")));
    }

    #[test]
    fn test_set_pose_of_unknown_uuid_leaves_state_untouched() {
        let mut s = state_with_peers();
        let before = s.clone();
        let err = s
            .apply(Transition::SetPoseOf(ClientId::new("zz"), Pose::new(1.0, 1.0)))
            .unwrap_err();
        assert!(matches!(err, RoomError::UnknownClient(id) if id.as_str() == "zz"));
        assert_eq!(s, before);
    }

    #[test]
    fn test_set_group_of_mutates_peer_in_place() {
        let mut s = state_with_peers();
        s.apply(Transition::SetGroupOf(ClientId::new("b"), RoomGroup::Muted))
            .unwrap();
        assert_eq!(s.clients[1].group, RoomGroup::Muted);
        assert_eq!(s.clients[1].name, "green");
    }

    #[test]
    fn test_local_pose_notification_carries_my_uuid() {
        let mut s = state_with_peers();
        let note = s.apply(Transition::SetPose(Pose::new(2.0, 3.0))).unwrap();
        assert_eq!(
            note,
            Some(RoomNotification::PoseChanged {
                uuid: ClientId::new("me"),
                pose: Pose::new(2.0, 3.0),
                local: true,
            })
        );
    }

    #[test]
    fn test_reset_sequence_clears_identity() {
        let mut s = state_with_peers();
        s.joined_room = true;
        for t in Transition::reset_sequence() {
            s.apply(t).unwrap();
        }
        assert!(s.me.uuid.is_empty());
        assert!(s.me.name.is_empty());
        assert!(!s.joined_room);
        assert_eq!(s.backend_model, BackendModel::default());
        // Peers and options are left alone.
        assert_eq!(s.clients.len(), 2);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(RoomState::default()).unwrap();
        assert_eq!(json["joinedRoom"], false);
        assert_eq!(json["isHost"], false);
        assert_eq!(json["backendModel"]["backendType"], "NoOp");
    }
}
