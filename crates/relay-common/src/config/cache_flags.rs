//! Member cache flags - which sources are allowed to populate a guild's member list

use bitflags::bitflags;
use serde::{Deserialize, Deserializer};
use std::fmt;

use super::ConfigError;

bitflags! {
    /// Controls which events may add members to the cache
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberCacheFlags: u8 {
        /// Members seen online through presence updates
        const ONLINE = 1 << 0;
        /// Members connected to voice
        const VOICE  = 1 << 1;
        /// Members from join/update events and chunk replies
        const JOINED = 1 << 2;
    }
}

impl MemberCacheFlags {
    /// Only online members are kept; going offline evicts
    #[inline]
    pub fn online_only(self) -> bool {
        self == Self::ONLINE
    }

    /// Only voice members are kept; leaving voice evicts
    #[inline]
    pub fn voice_only(self) -> bool {
        self == Self::VOICE
    }

    /// Parse a comma-separated list such as `online,voice`.
    ///
    /// `all` and `none` are accepted as shorthands.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let mut flags = Self::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            flags |= match part.to_lowercase().as_str() {
                "online" => Self::ONLINE,
                "voice" => Self::VOICE,
                "joined" => Self::JOINED,
                "all" => Self::all(),
                "none" => Self::empty(),
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MEMBER_CACHE_FLAGS",
                        part.to_string(),
                    ))
                }
            };
        }
        Ok(flags)
    }
}

impl Default for MemberCacheFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for MemberCacheFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::ONLINE, "online"),
            (Self::VOICE, "voice"),
            (Self::JOINED, "joined"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        f.write_str(&names.join(","))
    }
}

impl<'de> Deserialize<'de> for MemberCacheFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        MemberCacheFlags::parse(&raw).map_err(serde::de::Error::custom)
    }
}
