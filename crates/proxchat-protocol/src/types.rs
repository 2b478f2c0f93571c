//! The pose & group model: plain data shared by every proxchat layer.
//!
//! Nothing in here has behavior beyond construction, equality, and
//! validation. The room store owns instances of these types; adapters and
//! the relay hub only ever produce them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable per-session identity of a voice client, assigned by the relay hub.
///
/// Newtype over `String` so a client uuid can't be mixed up with a player
/// name (both are strings on the wire, but they key different lookups:
/// the store indexes by uuid, game backends only know in-game names).
///
/// The empty id means "no identity yet" and is what a session reset writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Creates a client id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns `true` for the "no identity" id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of the map a backend reports. Passed through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub u32);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// 2D position used for proximity falloff.
///
/// `{0, 0}` doubles as "unknown / reset": meetings collapse every pose to
/// the origin so the audio layer mixes everyone at equal volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
}

impl Pose {
    /// The origin, used as the reset pose.
    pub const ORIGIN: Pose = Pose { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rejects poses with NaN or infinite coordinates.
    pub fn validate(self) -> Result<Self, ProtocolError> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(self)
        } else {
            Err(ProtocolError::InvalidEventData(format!(
                "pose ({}, {}) has a non-finite coordinate",
                self.x, self.y
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// RoomGroup
// ---------------------------------------------------------------------------

/// The audio-mixing bucket a client currently belongs to.
///
/// Closed set: anything else on the wire fails to decode rather than being
/// mapped to a "closest" group. Serialized as the variant name
/// (`"Main"`, `"Muted"`, `"Spectator"`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum RoomGroup {
    /// Hears and is heard by everyone in the room, no proximity.
    #[default]
    Spectator,
    /// Proximity-mixed group of living players.
    Main,
    /// In the game but silenced (e.g. comms sabotaged).
    Muted,
}

impl fmt::Display for RoomGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spectator => write!(f, "Spectator"),
            Self::Main => write!(f, "Main"),
            Self::Muted => write!(f, "Muted"),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientRecord
// ---------------------------------------------------------------------------

/// One voice client as the room store sees it.
///
/// Created on join, mutated in place on pose/group updates, removed on
/// leave. `uuid` is the identity key for every lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub uuid: ClientId,
    pub name: String,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub group: RoomGroup,
}

impl ClientRecord {
    /// A freshly joined client: origin pose, spectator group.
    pub fn new(uuid: impl Into<ClientId>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            pose: Pose::ORIGIN,
            group: RoomGroup::Spectator,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_group(mut self, group: RoomGroup) -> Self {
        self.group = group;
        self
    }

    /// Checks the parts of a record that serde can't (finite pose).
    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.pose.validate().map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// HostOptions
// ---------------------------------------------------------------------------

/// Audio tuning chosen by the room host.
///
/// Stored and forwarded by the core, interpreted only by the audio layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOptions {
    /// Distance at which a voice fades out completely.
    pub falloff: f64,
    /// Whether falloff follows the in-game vision radius.
    pub falloff_vision: bool,
    /// Whether walls block voice.
    pub colliders: bool,
    /// Whether PA systems (cameras, admin) broadcast voice.
    pub pa_systems: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            falloff: 3.6,
            falloff_vision: false,
            colliders: false,
            pa_systems: true,
        }
    }
}

// ---------------------------------------------------------------------------
// BackendModel
// ---------------------------------------------------------------------------

/// Which kind of game backend a room is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendType {
    NoOp,
    Impostor,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "NoOp"),
            Self::Impostor => write!(f, "Impostor"),
        }
    }
}

/// Default coalescing interval for player movement, in milliseconds.
pub const DEFAULT_MOVE_THROTTLE_MS: u64 = 50;

fn default_move_throttle() -> u64 {
    DEFAULT_MOVE_THROTTLE_MS
}

/// Connection parameters for an Impostor server's event hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpostorParams {
    /// Host name or IP of the Impostor server.
    pub ip: String,
    /// Hub port. `None` means the plugin's default port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Minimum interval between pose updates per player, in milliseconds.
    #[serde(rename = "throttle", default = "default_move_throttle")]
    pub throttle_ms: u64,
}

impl ImpostorParams {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: None,
            throttle_ms: DEFAULT_MOVE_THROTTLE_MS,
        }
    }
}

/// Backend-specific half of a [`BackendModel`], tagged by `backendType`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backendType")]
pub enum BackendParams {
    /// No game attached; groups and poses only change through the hub.
    #[default]
    NoOp,
    Impostor(ImpostorParams),
}

/// Identifies which adapter to build and which game instance to follow.
///
/// On the wire the backend parameters sit next to `gameCode`:
///
/// ```json
/// { "gameCode": "ABCDEF", "backendType": "Impostor", "ip": "10.0.0.2", "throttle": 50 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendModel {
    pub game_code: String,
    #[serde(flatten)]
    pub backend: BackendParams,
}

impl BackendModel {
    pub fn new(game_code: impl Into<String>, backend: BackendParams) -> Self {
        Self {
            game_code: game_code.into(),
            backend,
        }
    }

    pub fn backend_type(&self) -> BackendType {
        match self.backend {
            BackendParams::NoOp => BackendType::NoOp,
            BackendParams::Impostor(_) => BackendType::Impostor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_client_id_default_is_empty() {
        assert!(ClientId::default().is_empty());
        assert!(!ClientId::from("x").is_empty());
    }

    #[test]
    fn test_pose_default_is_origin() {
        assert_eq!(Pose::default(), Pose::ORIGIN);
    }

    #[test]
    fn test_pose_validate_rejects_non_finite() {
        assert!(Pose::new(1.0, 2.0).validate().is_ok());
        assert!(matches!(
            Pose::new(f64::NAN, 0.0).validate(),
            Err(ProtocolError::InvalidEventData(_))
        ));
        assert!(Pose::new(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_room_group_wire_names() {
        for group in [RoomGroup::Spectator, RoomGroup::Main, RoomGroup::Muted] {
            let json = serde_json::to_string(&group).unwrap();
            assert_eq!(json, format!("\"{group}\""));
        }
    }

    #[test]
    fn test_room_group_unknown_value_is_rejected() {
        let result: Result<RoomGroup, _> = serde_json::from_str("\"Ghost\"");
        assert!(result.is_err());
        let muted: RoomGroup = serde_json::from_str("\"Muted\"").unwrap();
        assert_eq!(muted, RoomGroup::Muted);
    }

    #[test]
    fn test_client_record_defaults_missing_pose_and_group() {
        let rec: ClientRecord =
            serde_json::from_str(r#"{"uuid":"u1","name":"red"}"#).unwrap();
        assert_eq!(rec, ClientRecord::new("u1", "red"));
    }

    #[test]
    fn test_host_options_defaults() {
        let opts = HostOptions::default();
        assert_eq!(opts.falloff, 3.6);
        assert!(!opts.falloff_vision);
        assert!(!opts.colliders);
        assert!(opts.pa_systems);
    }

    #[test]
    fn test_host_options_camel_case_fields() {
        let json = serde_json::to_value(HostOptions::default()).unwrap();
        assert_eq!(json["falloffVision"], false);
        assert_eq!(json["paSystems"], true);
    }

    #[test]
    fn test_backend_model_default_is_empty_noop() {
        let model = BackendModel::default();
        assert_eq!(model.game_code, "");
        assert_eq!(model.backend_type(), BackendType::NoOp);
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["gameCode"], "");
        assert_eq!(json["backendType"], "NoOp");
    }

    #[test]
    fn test_backend_model_impostor_flat_json() {
        let json = r#"{
            "gameCode": "ABCDEF",
            "backendType": "Impostor",
            "ip": "10.0.0.2",
            "throttle": 120
        }"#;
        let model: BackendModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.game_code, "ABCDEF");
        assert_eq!(model.backend_type(), BackendType::Impostor);
        let BackendParams::Impostor(params) = &model.backend else {
            panic!("expected impostor params");
        };
        assert_eq!(params.ip, "10.0.0.2");
        assert_eq!(params.port, None);
        assert_eq!(params.throttle_ms, 120);
    }

    #[test]
    fn test_backend_model_impostor_throttle_defaults() {
        let json =
            r#"{"gameCode":"X","backendType":"Impostor","ip":"localhost"}"#;
        let model: BackendModel = serde_json::from_str(json).unwrap();
        assert_eq!(
            model.backend,
            BackendParams::Impostor(ImpostorParams::new("localhost"))
        );
    }

    #[test]
    fn test_backend_model_unknown_backend_type_is_rejected() {
        let json = r#"{"gameCode":"X","backendType":"Telepathy"}"#;
        let result: Result<BackendModel, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
