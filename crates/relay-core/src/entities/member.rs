//! Member entity - a user's membership in a guild

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::presence::Presence;
use super::user::UserRef;
use crate::value_objects::Snowflake;

/// Guild member.
///
/// Owned by exactly one guild. The `user` handle is shared with the global
/// user table and every other holder of the same account.
#[derive(Debug, Clone)]
pub struct Member {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub user: UserRef,
    pub nick: Option<String>,
    pub avatar: Option<String>,
    pub role_ids: Vec<Snowflake>,
    /// `None` for partial records (presence- or list-derived)
    pub joined_at: Option<DateTime<Utc>>,
    pub premium_since: Option<DateTime<Utc>>,
    pub deaf: bool,
    pub mute: bool,
    pub pending: bool,
    pub presence: Presence,
}

impl Member {
    /// Create a bare member record for `user` in `guild_id`
    pub fn new(guild_id: Snowflake, user: UserRef) -> Self {
        let user_id = user.read().id;
        Self {
            guild_id,
            user_id,
            user,
            nick: None,
            avatar: None,
            role_ids: Vec::new(),
            joined_at: None,
            premium_since: None,
            deaf: false,
            mute: false,
            pending: false,
            presence: Presence::default(),
        }
    }

    /// Display name (nickname if set, otherwise the account name)
    pub fn display_name(&self) -> String {
        match &self.nick {
            Some(nick) => nick.clone(),
            None => self.user.read().name.clone(),
        }
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Whether this is a full record (has a join timestamp)
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.joined_at.is_some()
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        let same_user = Arc::ptr_eq(&self.user, &other.user) || *self.user.read() == *other.user.read();
        same_user
            && self.guild_id == other.guild_id
            && self.user_id == other.user_id
            && self.nick == other.nick
            && self.avatar == other.avatar
            && self.role_ids == other.role_ids
            && self.joined_at == other.joined_at
            && self.premium_since == other.premium_since
            && self.deaf == other.deaf
            && self.mute == other.mute
            && self.pending == other.pending
            && self.presence == other.presence
    }
}
