//! Custom emoji entities

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::Snowflake;

/// Guild custom emoji, indexed globally by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emoji {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
    pub animated: bool,
    pub managed: bool,
    pub require_colons: bool,
    pub available: bool,
    pub role_ids: Vec<Snowflake>,
}

/// Emoji reference as seen on reactions.
///
/// Unicode emoji have no id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialEmoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl PartialEmoji {
    /// Unicode emoji
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            animated: false,
        }
    }

    #[inline]
    pub fn is_custom(&self) -> bool {
        self.id.is_some()
    }
}

impl From<&Emoji> for PartialEmoji {
    fn from(emoji: &Emoji) -> Self {
        Self {
            id: Some(emoji.id),
            name: Some(emoji.name.clone()),
            animated: emoji.animated,
        }
    }
}

impl fmt::Display for PartialEmoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("_");
        match self.id {
            Some(id) if self.animated => write!(f, "<a:{name}:{id}>"),
            Some(id) => write!(f, "<:{name}:{id}>"),
            None => f.write_str(name),
        }
    }
}
