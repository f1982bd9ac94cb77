//! Discrete gesture commands exchanged between the two processes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Action requested by a completed gesture.
///
/// Serialized as `CIRCLE_MOTION` / `TAKE_PHOTO` in the channel file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Panoramic circle maneuver with continuous video capture.
    CircleMotion,
    /// Single still capture.
    TakePhoto,
}

impl CommandKind {
    /// Map a completed gesture's snap count to a command.
    ///
    /// One snap → panorama, two snaps → photo, anything else → `None`.
    pub const fn from_snap_count(count: u32) -> Option<Self> {
        match count {
            1 => Some(Self::CircleMotion),
            2 => Some(Self::TakePhoto),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircleMotion => f.write_str("CIRCLE_MOTION"),
            Self::TakePhoto => f.write_str("TAKE_PHOTO"),
        }
    }
}

/// A command as persisted in the channel. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Monotonically increasing per queue generation, starting at 1.
    pub sequence_number: u64,
    pub kind: CommandKind,
    /// Creation time [µs since the Unix epoch].
    pub created_at: u64,
}

impl Command {
    pub const fn new(sequence_number: u64, kind: CommandKind, created_at: u64) -> Self {
        Self {
            sequence_number,
            kind,
            created_at,
        }
    }
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn unix_time_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
