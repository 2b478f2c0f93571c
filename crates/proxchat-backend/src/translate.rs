//! The Impostor event vocabulary and its translation into [`BackendEvent`]s.

use proxchat_protocol::{BackendEvent, MapId, Pose, ProtocolError, RoomGroup};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Name of the outbound "track this game" invocation.
pub const TRACK_GAME: &str = "TrackGame";

/// An event pushed by the Impostor hub, validated but not yet translated.
#[derive(Debug, Clone, PartialEq)]
pub enum ImpostorEvent {
    MapChange(MapId),
    GameStarted,
    PlayerMove { name: String, pose: Pose },
    MeetingCalled,
    PlayerExiled { name: String },
    /// `fix == false` when comms go down, `true` when they are repaired.
    CommsSabotage { fix: bool },
    GameEnd,
}

impl ImpostorEvent {
    /// Validates an invocation's target and arguments.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidEventData`] for an unknown target, the wrong
    /// number of arguments, an argument of the wrong JSON type, or a
    /// non-finite pose.
    pub fn from_invocation(target: &str, arguments: Vec<Value>) -> Result<Self, ProtocolError> {
        Ok(match target {
            "MapChange" => {
                let [id] = arity(target, arguments)?;
                Self::MapChange(MapId(arg(target, id)?))
            }
            "GameStarted" => {
                arity::<0>(target, arguments)?;
                Self::GameStarted
            }
            "PlayerMove" => {
                let [name, pose] = arity(target, arguments)?;
                let pose: Pose = arg(target, pose)?;
                Self::PlayerMove {
                    name: arg(target, name)?,
                    pose: pose.validate()?,
                }
            }
            "MeetingCalled" => {
                arity::<0>(target, arguments)?;
                Self::MeetingCalled
            }
            "PlayerExiled" => {
                let [name] = arity(target, arguments)?;
                Self::PlayerExiled {
                    name: arg(target, name)?,
                }
            }
            "CommsSabotage" => {
                let [fix] = arity(target, arguments)?;
                Self::CommsSabotage {
                    fix: arg(target, fix)?,
                }
            }
            "GameEnd" => {
                arity::<0>(target, arguments)?;
                Self::GameEnd
            }
            other => {
                return Err(ProtocolError::InvalidEventData(format!(
                    "unknown hub event {other:?}"
                )));
            }
        })
    }

    /// Maps the native event onto the normalized vocabulary.
    pub fn translate(self) -> BackendEvent {
        match self {
            Self::MapChange(map) => BackendEvent::MapChange(map),
            Self::GameStarted => BackendEvent::AllPlayersJoinGroup(RoomGroup::Main),
            Self::PlayerMove { name, pose } => BackendEvent::PlayerPose { name, pose },
            Self::MeetingCalled => BackendEvent::AllPlayerPoses(Pose::ORIGIN),
            Self::PlayerExiled { name } => BackendEvent::PlayerJoinGroup {
                name,
                group: RoomGroup::Spectator,
            },
            Self::CommsSabotage { fix: false } => BackendEvent::PlayersFromGroup {
                from: RoomGroup::Main,
                to: RoomGroup::Muted,
            },
            Self::CommsSabotage { fix: true } => BackendEvent::PlayersFromGroup {
                from: RoomGroup::Muted,
                to: RoomGroup::Main,
            },
            Self::GameEnd => BackendEvent::AllPlayersJoinGroup(RoomGroup::Spectator),
        }
    }
}

fn arity<const N: usize>(target: &str, arguments: Vec<Value>) -> Result<[Value; N], ProtocolError> {
    arguments.try_into().map_err(|got: Vec<Value>| {
        ProtocolError::InvalidEventData(format!(
            "{target} takes {N} argument(s), got {}",
            got.len()
        ))
    })
}

fn arg<T: DeserializeOwned>(target: &str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value)
        .map_err(|e| ProtocolError::InvalidEventData(format!("{target}: {e}")))
}
