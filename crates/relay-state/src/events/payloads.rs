//! Event payload definitions
//!
//! Typed views of the `d` field of each dispatch record. Fields the engine
//! does not use are ignored; fields that may be absent are `Option` or
//! `#[serde(default)]` so a sparse update never looks like a reset.

use chrono::{DateTime, Utc};
use relay_core::{
    Activity, ChannelType, ClientStatus, PartialEmoji, Presence, Role, Snowflake, Status,
};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

// === Users ===

/// Full user object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
}

/// User object that may carry only an id (presence updates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUserPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl PartialUserPayload {
    /// Promote to a full user when enough fields are present
    pub fn to_full(&self) -> Option<UserPayload> {
        let username = self.username.clone()?;
        Some(UserPayload {
            id: self.id,
            username,
            discriminator: self.discriminator.clone().unwrap_or_default(),
            avatar: self.avatar.clone(),
            bot: false,
            system: false,
        })
    }
}

// === Members and presences ===

/// Guild member object.
///
/// Baseline payloads may reference the user only by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPayload {
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub user_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<Snowflake>>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub premium_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: Option<bool>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub pending: Option<bool>,
    /// Nested presence (member list items)
    #[serde(default)]
    pub presence: Option<PresencePayload>,
}

impl MemberPayload {
    pub fn user_id(&self) -> Option<Snowflake> {
        self.user.as_ref().map(|u| u.id).or(self.user_id)
    }
}

/// Presence object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    #[serde(default)]
    pub user: Option<PartialUserPayload>,
    #[serde(default)]
    pub user_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub client_status: ClientStatus,
}

impl PresencePayload {
    pub fn user_id(&self) -> Option<Snowflake> {
        self.user.as_ref().map(|u| u.id).or(self.user_id)
    }

    pub fn to_presence(&self) -> Presence {
        Presence {
            status: self.status,
            activities: self.activities.clone(),
            client_status: self.client_status.clone(),
        }
    }
}

// === Guilds ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub require_colons: bool,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceStatePayload {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_stream: bool,
    #[serde(default)]
    pub self_video: bool,
    #[serde(default)]
    pub suppress: bool,
    /// Sent when the member may not be cached
    #[serde(default)]
    pub member: Option<MemberPayload>,
}

/// Guild object (GUILD_CREATE, GUILD_UPDATE and baseline entries).
///
/// Collections are `None` when the payload does not carry them, so an
/// update never wipes data it did not mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub large: Option<bool>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub channels: Option<Vec<ChannelPayload>>,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub emojis: Option<Vec<EmojiPayload>>,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub presences: Vec<PresencePayload>,
    #[serde(default)]
    pub voice_states: Vec<VoiceStatePayload>,
}

/// GUILD_DELETE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildDeletePayload {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// GUILD_BAN_ADD / GUILD_BAN_REMOVE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildBanPayload {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildEmojisUpdatePayload {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub emojis: Vec<EmojiPayload>,
}

/// GUILD_ROLE_CREATE / GUILD_ROLE_UPDATE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRolePayload {
    pub guild_id: Snowflake,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleDeletePayload {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberRemovePayload {
    pub guild_id: Snowflake,
    pub user: PartialUserPayload,
}

/// GUILD_MEMBERS_CHUNK
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersChunkPayload {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub chunk_count: Option<u32>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub presences: Vec<PresencePayload>,
}

impl MembersChunkPayload {
    /// The batch that completes its request
    pub fn is_final(&self) -> bool {
        self.chunk_count
            .is_some_and(|count| self.chunk_index.saturating_add(1) == count)
    }
}

/// GUILD_MEMBER_LIST_UPDATE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListUpdatePayload {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub groups: Vec<MemberListGroup>,
    #[serde(default)]
    pub ops: Vec<MemberListOp>,
}

impl MemberListUpdatePayload {
    /// Sum of every non-offline group
    pub fn online_count(&self) -> u64 {
        self.groups
            .iter()
            .filter(|g| g.id != MemberListGroup::OFFLINE)
            .map(|g| g.count)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberListGroup {
    pub id: String,
    #[serde(default)]
    pub count: u64,
}

impl MemberListGroup {
    pub const OFFLINE: &'static str = "offline";
}

/// One member list operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberListOp {
    /// Replace a range with a fresh batch
    Sync {
        #[serde(default)]
        items: Vec<MemberListItem>,
    },
    /// A member entered the visible range
    Insert { item: MemberListItem },
    /// A visible entry changed
    Update { item: MemberListItem },
    /// DELETE and INVALIDATE address rows by index only
    #[serde(other)]
    Other,
}

/// Member list row; group headers carry no member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListItem {
    #[serde(default)]
    pub member: Option<MemberPayload>,
    #[serde(default)]
    pub group: Option<MemberListGroup>,
}

// === Session ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipPayload {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: i32,
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub user_id: Option<Snowflake>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// READY: first half of the baseline snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub user: UserPayload,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub guilds: Vec<GuildPayload>,
    /// Users referenced by id elsewhere in the snapshot
    #[serde(default)]
    pub users: Vec<UserPayload>,
    #[serde(default)]
    pub relationships: Vec<RelationshipPayload>,
    #[serde(default)]
    pub private_channels: Vec<ChannelPayload>,
    /// Per guild, the session user's own member record
    #[serde(default)]
    pub merged_members: Vec<Vec<MemberPayload>>,
}

/// READY_SUPPLEMENTAL: second half of the baseline snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadySupplementalPayload {
    #[serde(default)]
    pub guilds: Vec<SupplementalGuild>,
    /// Per guild, additional member records
    #[serde(default)]
    pub merged_members: Vec<Vec<MemberPayload>>,
    #[serde(default)]
    pub merged_presences: MergedPresences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplementalGuild {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub voice_states: Vec<VoiceStatePayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedPresences {
    #[serde(default)]
    pub guilds: Vec<Vec<PresencePayload>>,
    #[serde(default)]
    pub friends: Vec<PresencePayload>,
}

// === Channels ===

/// Channel object, guild or private
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: i32,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    pub recipients: Option<Vec<UserPayload>>,
    #[serde(default)]
    pub recipient_ids: Option<Vec<Snowflake>>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
}

impl ChannelPayload {
    pub fn channel_type(&self) -> ChannelType {
        ChannelType::from(self.kind)
    }
}

/// CHANNEL_RECIPIENT_ADD / CHANNEL_RECIPIENT_REMOVE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecipientPayload {
    pub channel_id: Snowflake,
    pub user: UserPayload,
}

// === Messages ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: UserPayload,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
}

/// MESSAGE_UPDATE carries only the changed fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageUpdatePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<UserPayload>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub mention_everyone: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeletePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteBulkPayload {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: PartialEmoji,
    #[serde(default)]
    pub member: Option<MemberPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionClearPayload {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

// === Typing ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingStartPayload {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub member: Option<MemberPayload>,
}
