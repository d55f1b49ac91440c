//! Role entity

use serde::{Deserialize, Serialize};

use crate::value_objects::{Permissions, Snowflake};

/// Guild role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    /// The @everyone role shares its guild's identifier
    #[inline]
    pub fn is_default(&self, guild_id: Snowflake) -> bool {
        self.id == guild_id
    }
}
