//! Guild entity - top-level container owning members, channels, roles and emojis

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::channel::GuildChannel;
use super::emoji::Emoji;
use super::member::Member;
use super::role::Role;
use super::voice_state::VoiceState;
use crate::value_objects::{Permissions, Snowflake};

/// Shared handle to a cached guild
pub type GuildRef = Arc<RwLock<Guild>>;

/// Guild (server) entity
#[derive(Debug, Clone, Default)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub owner_id: Snowflake,
    pub large: bool,
    /// Temporarily unreachable; data is retained but stale
    pub unavailable: bool,
    /// Member list fully resolved by a chunk request
    pub chunked: bool,
    /// Presence subscription issued for this session
    pub subscribed: bool,
    /// Server-declared totals; may exceed the cached member count
    pub member_count: Option<u64>,
    pub online_count: Option<u64>,
    pub members: HashMap<Snowflake, Member>,
    pub channels: HashMap<Snowflake, GuildChannel>,
    pub roles: HashMap<Snowflake, Role>,
    pub emojis: Vec<Emoji>,
    pub voice_states: HashMap<Snowflake, VoiceState>,
}

impl Guild {
    /// Create a new, empty Guild
    pub fn new(id: Snowflake, name: impl Into<String>, owner_id: Snowflake) -> Self {
        Self {
            id,
            name: name.into(),
            owner_id,
            ..Self::default()
        }
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> GuildRef {
        Arc::new(RwLock::new(self))
    }

    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == user_id
    }

    pub fn get_member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members.get(&user_id)
    }

    pub fn get_member_mut(&mut self, user_id: Snowflake) -> Option<&mut Member> {
        self.members.get_mut(&user_id)
    }

    /// Insert or overwrite a member
    pub fn add_member(&mut self, member: Member) {
        self.members.insert(member.user_id, member);
    }

    pub fn remove_member(&mut self, user_id: Snowflake) -> Option<Member> {
        self.members.remove(&user_id)
    }

    pub fn get_channel(&self, channel_id: Snowflake) -> Option<&GuildChannel> {
        self.channels.get(&channel_id)
    }

    pub fn add_channel(&mut self, channel: GuildChannel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn remove_channel(&mut self, channel_id: Snowflake) -> Option<GuildChannel> {
        self.channels.remove(&channel_id)
    }

    pub fn get_role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    pub fn add_role(&mut self, role: Role) {
        self.roles.insert(role.id, role);
    }

    pub fn remove_role(&mut self, role_id: Snowflake) -> Option<Role> {
        self.roles.remove(&role_id)
    }

    /// Effective guild-level permissions of a cached member.
    ///
    /// The owner and administrators get everything; everyone else gets the
    /// union of @everyone and their roles. Unknown members get nothing.
    pub fn member_permissions(&self, user_id: Snowflake) -> Permissions {
        if self.is_owner(user_id) {
            return Permissions::ALL;
        }

        let Some(member) = self.members.get(&user_id) else {
            return Permissions::empty();
        };

        let everyone = self
            .roles
            .get(&self.id)
            .map(|r| r.permissions)
            .unwrap_or_default();

        let granted = Permissions::combine(
            member
                .role_ids
                .iter()
                .filter_map(|id| self.roles.get(id))
                .map(|r| r.permissions),
        ) | everyone;

        if granted.contains(Permissions::ADMINISTRATOR) {
            Permissions::ALL
        } else {
            granted
        }
    }

    /// Record a voice state change, returning the previous state.
    ///
    /// A state without a channel means the user left voice and is dropped.
    pub fn update_voice_state(&mut self, state: VoiceState) -> Option<VoiceState> {
        if state.channel_id.is_none() {
            self.voice_states.remove(&state.user_id)
        } else {
            self.voice_states.insert(state.user_id, state)
        }
    }
}
