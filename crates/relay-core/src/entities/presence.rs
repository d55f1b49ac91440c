//! Presence data - volatile status and activity attached to a member

use serde::{Deserialize, Serialize};

/// Online status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Idle,
    /// Do not disturb
    Dnd,
    #[default]
    Offline,
    Invisible,
}

impl Status {
    /// Whether this status counts as offline for cache eviction purposes
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline | Self::Invisible)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
            Self::Invisible => "invisible",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::Dnd),
            "offline" => Ok(Self::Offline),
            "invisible" => Ok(Self::Invisible),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

/// Per-platform status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<Status>,
}

/// A single activity (game, stream, custom status...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Presence snapshot held by a member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    pub status: Status,
    pub activities: Vec<Activity>,
    pub client_status: ClientStatus,
}

impl Presence {
    /// The first activity, which clients display as "the" activity
    pub fn activity(&self) -> Option<&Activity> {
        self.activities.first()
    }
}
