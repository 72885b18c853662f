use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub type SessionId = i64;
pub type MarkerId = i64;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SNAPSHOT_PATH: &str = "./save.json";
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(10);
pub const REAP_INTERVAL: Duration = Duration::from_secs(1);
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct Position {
    #[serde(deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub author: String,
    pub position: Position,
}

impl Marker {
    pub fn new(id: MarkerId, author: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            author: author.into(),
            position,
        }
    }
}

/// Decodes `null` the same way as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Requests. Missing or null fields decode to zero values.

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub user_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePositionRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: SessionId,
    #[serde(deserialize_with = "null_as_default")]
    pub position: Position,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AddMarkerRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: SessionId,
    #[serde(deserialize_with = "null_as_default")]
    pub position: Position,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveMarkerRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: SessionId,
    #[serde(deserialize_with = "null_as_default")]
    pub marker_id: MarkerId,
}

// Responses

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: SessionId,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub new_markers: Vec<Marker>,
    #[serde(default)]
    pub removed_markers: Vec<MarkerId>,
    #[serde(default)]
    pub user_positions: BTreeMap<String, Position>,
}

/// On-disk marker snapshot
///
/// `CurrentMarkerId` is the last identifier handed out.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Snapshot {
    #[serde(default, rename = "CurrentMarkerId")]
    pub current_marker_id: MarkerId,
    #[serde(default)]
    pub markers: Vec<Marker>,
}
