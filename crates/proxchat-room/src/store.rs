//! The dispatcher: turns inbound events into transitions.
//!
//! Two kinds of event reach the store:
//!
//! - [`RoomEvent`]s from the relay hub, keyed by uuid. Pose and group
//!   updates are routed to the local client or to a peer by comparing the
//!   uuid with `me.uuid`. That comparison lives in [`RoomStore::route_pose`]
//!   and [`RoomStore::route_group`] and nowhere else.
//! - [`BackendEvent`]s from a game backend, keyed by in-game name. Names are
//!   resolved against the current roster, and bulk events ("everyone",
//!   "everyone in Main") are expanded over it, inside the same call. The
//!   roster they see is never stale.

use proxchat_protocol::{BackendEvent, ClientId, ClientRecord, Pose, RoomEvent, RoomGroup};

use crate::{RoomError, RoomNotification, RoomState, Transition};

/// Owns a [`RoomState`] and applies events to it.
///
/// Single-threaded on purpose: wrap it in [`spawn_store`](crate::spawn_store)
/// to share it.
#[derive(Debug, Default)]
pub struct RoomStore {
    state: RoomState,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: RoomState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    /// Applies a single transition directly, bypassing the dispatcher.
    pub fn apply(
        &mut self,
        transition: Transition,
    ) -> Result<Option<RoomNotification>, RoomError> {
        self.state.apply(transition)
    }

    // -----------------------------------------------------------------------
    // Relay hub events
    // -----------------------------------------------------------------------

    /// Applies a relay-hub event.
    ///
    /// # Errors
    /// - [`RoomError::LocalClient`] / [`RoomError::DuplicateClient`] when an
    ///   `AddClient` would break roster uniqueness.
    /// - [`RoomError::UnknownClient`] when a pose or group update names a
    ///   peer that isn't in the roster.
    ///
    /// On error the state is unchanged.
    pub fn dispatch(&mut self, event: RoomEvent) -> Result<Vec<RoomNotification>, RoomError> {
        match event {
            RoomEvent::SetUuid { uuid } => {
                let mut notes = Vec::new();
                // A peer already carrying our new identity would break the
                // "me is not a peer" invariant.
                if !uuid.is_empty() && self.state.has_client(&uuid) {
                    tracing::warn!(%uuid, "evicting peer that carries the local uuid");
                    notes.extend(self.state.apply(Transition::RemoveClient(uuid.clone()))?);
                }
                notes.extend(self.state.apply(Transition::SetUuid(uuid))?);
                Ok(notes)
            }
            RoomEvent::AddClient(record) => {
                if self.state.is_me(&record.uuid) {
                    return Err(RoomError::LocalClient(record.uuid));
                }
                if self.state.has_client(&record.uuid) {
                    return Err(RoomError::DuplicateClient(record.uuid));
                }
                self.one(Transition::AddClient(record))
            }
            RoomEvent::SetAllClients { clients } => {
                let clients = self.sanitize_roster(clients);
                self.one(Transition::SetAllClients(clients))
            }
            RoomEvent::RemoveClient { uuid } => self.one(Transition::RemoveClient(uuid)),
            RoomEvent::SetPose { uuid, pose } => self.route_pose(uuid, pose).map(Vec::from_iter),
            RoomEvent::SetGroup { uuid, group } => {
                self.route_group(uuid, group).map(Vec::from_iter)
            }
            RoomEvent::SetJoinedRoom { joined } => self.one(Transition::SetJoinedRoom(joined)),
            RoomEvent::SetNameAndBackendModel {
                name,
                backend_model,
            } => self.one(Transition::SetNameAndBackendModel {
                name,
                backend_model,
            }),
            RoomEvent::SetHost { is_host } => self.one(Transition::SetHost(is_host)),
            RoomEvent::SetOptions { options } => self.one(Transition::SetOptions(options)),
        }
    }

    /// Routes a pose update to the local client or a peer.
    pub fn route_pose(
        &mut self,
        uuid: ClientId,
        pose: Pose,
    ) -> Result<Option<RoomNotification>, RoomError> {
        if self.state.is_me(&uuid) {
            self.state.apply(Transition::SetPose(pose))
        } else {
            self.state.apply(Transition::SetPoseOf(uuid, pose))
        }
    }

    /// Routes a group update to the local client or a peer.
    pub fn route_group(
        &mut self,
        uuid: ClientId,
        group: RoomGroup,
    ) -> Result<Option<RoomNotification>, RoomError> {
        if self.state.is_me(&uuid) {
            self.state.apply(Transition::SetGroup(group))
        } else {
            self.state.apply(Transition::SetGroupOf(uuid, group))
        }
    }

    /// Drops the local uuid and repeated uuids from a resync list, keeping
    /// the first occurrence of each.
    fn sanitize_roster(&self, clients: Vec<ClientRecord>) -> Vec<ClientRecord> {
        let total = clients.len();
        let mut kept: Vec<ClientRecord> = Vec::with_capacity(total);
        for record in clients {
            if self.state.is_me(&record.uuid) || kept.iter().any(|k| k.uuid == record.uuid) {
                continue;
            }
            kept.push(record);
        }
        if kept.len() != total {
            tracing::warn!(
                dropped = total - kept.len(),
                "resync contained the local client or duplicate uuids"
            );
        }
        kept
    }

    // -----------------------------------------------------------------------
    // Backend events
    // -----------------------------------------------------------------------

    /// Applies a normalized backend event.
    ///
    /// Bulk events touch the local client and every peer. A `PlayerPose` or
    /// `PlayerJoinGroup` for a name nobody has returns
    /// [`RoomError::UnknownPlayer`] and changes nothing.
    pub fn apply_backend(
        &mut self,
        event: BackendEvent,
    ) -> Result<Vec<RoomNotification>, RoomError> {
        match event {
            BackendEvent::MapChange(map) => Ok(vec![RoomNotification::MapChanged(map)]),
            BackendEvent::PlayerPose { name, pose } => {
                let uuid = self.resolve_name(&name)?;
                self.route_pose(uuid, pose).map(Vec::from_iter)
            }
            BackendEvent::AllPlayerPoses(pose) => {
                let targets = self.uuids_where(|_| true);
                self.for_each_target(targets, |store, uuid| store.route_pose(uuid, pose))
            }
            BackendEvent::PlayerJoinGroup { name, group } => {
                let uuid = self.resolve_name(&name)?;
                self.route_group(uuid, group).map(Vec::from_iter)
            }
            BackendEvent::AllPlayersJoinGroup(group) => {
                let targets = self.uuids_where(|_| true);
                self.for_each_target(targets, |store, uuid| store.route_group(uuid, group))
            }
            BackendEvent::PlayersFromGroup { from, to } => {
                let targets = self.uuids_where(|c| c.group == from);
                self.for_each_target(targets, |store, uuid| store.route_group(uuid, to))
            }
        }
    }

    /// Maps an in-game player name to the uuid of the local client or a
    /// peer. The local client wins if a peer shares its name.
    fn resolve_name(&self, name: &str) -> Result<ClientId, RoomError> {
        if name.is_empty() {
            return Err(RoomError::UnknownPlayer(String::new()));
        }
        self.state
            .everyone()
            .find(|c| c.name == name)
            .map(|c| c.uuid.clone())
            .ok_or_else(|| RoomError::UnknownPlayer(name.to_string()))
    }

    fn uuids_where(&self, pred: impl Fn(&ClientRecord) -> bool) -> Vec<ClientId> {
        self.state
            .everyone()
            .filter(|c| pred(c))
            .map(|c| c.uuid.clone())
            .collect()
    }

    fn for_each_target(
        &mut self,
        targets: Vec<ClientId>,
        mut f: impl FnMut(&mut Self, ClientId) -> Result<Option<RoomNotification>, RoomError>,
    ) -> Result<Vec<RoomNotification>, RoomError> {
        let mut notes = Vec::with_capacity(targets.len());
        for uuid in targets {
            // Targets come from the roster this call is about to mutate, so
            // every lookup succeeds.
            notes.extend(f(self, uuid)?);
        }
        Ok(notes)
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Returns the session to "not connected": empty uuid, not joined, empty
    /// name and default backend model. Peers, options and host flag stay.
    ///
    /// Idempotent.
    pub fn reset(&mut self) -> Vec<RoomNotification> {
        let mut notes: Vec<RoomNotification> = Transition::reset_sequence()
            .into_iter()
            .filter_map(|t| self.state.apply(t).ok().flatten())
            .collect();
        notes.push(RoomNotification::Reset);
        notes
    }

    fn one(&mut self, transition: Transition) -> Result<Vec<RoomNotification>, RoomError> {
        Ok(self.state.apply(transition)?.into_iter().collect())
    }
}
