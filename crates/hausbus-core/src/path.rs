//! Hierarchical position addressing

use serde::{Deserialize, Serialize};

/// Immutable hierarchical address of a device or room:
/// `location/floor/room[/device]`.
///
/// Used as the universal lookup and deduplication key. Equality and
/// hashing are structural (component tuple), so paths built independently
/// from the same components compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionPath {
    location: String,
    floor: String,
    room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device: Option<String>,
}

impl PositionPath {
    /// Create a room-level path.
    pub fn new(
        location: impl Into<String>,
        floor: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            floor: floor.into(),
            room: room.into(),
            device: None,
        }
    }

    /// Derive a device-level path within this room.
    #[must_use]
    pub fn with_device(&self, device: impl Into<String>) -> Self {
        Self {
            location: self.location.clone(),
            floor: self.floor.clone(),
            room: self.room.clone(),
            device: Some(device.into()),
        }
    }

    /// True if every present component matches exactly.
    #[must_use]
    pub fn is_same(&self, other: &PositionPath) -> bool {
        self == other
    }

    /// True if location, floor and room match, ignoring the device component.
    #[must_use]
    pub fn same_room(&self, other: &PositionPath) -> bool {
        self.location == other.location && self.floor == other.floor && self.room == other.room
    }

    /// Stable dot-joined key (e.g. `home.upper.bath.top`).
    #[must_use]
    pub fn id(&self) -> String {
        match &self.device {
            Some(device) => format!("{}.{}.{}.{}", self.location, self.floor, self.room, device),
            None => self.room_id(),
        }
    }

    /// Room-granularity dot-joined key, ignoring the device component.
    #[must_use]
    pub fn room_id(&self) -> String {
        format!("{}.{}.{}", self.location, self.floor, self.room)
    }

    /// Slash-joined display path (e.g. `home/upper/bath/top`).
    #[must_use]
    pub fn path(&self) -> String {
        match &self.device {
            Some(device) => format!("{}/{}/{}/{}", self.location, self.floor, self.room, device),
            None => format!("{}/{}/{}", self.location, self.floor, self.room),
        }
    }

    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

impl std::fmt::Display for PositionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
