//! Gateway event types
//!
//! Every dispatch record name the engine knows how to apply.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway event types
///
/// These are the names carried in the `t` field of dispatch records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    // Session events
    /// Baseline snapshot, first half
    Ready,
    /// Baseline snapshot, second half (voice states, merged members and presences)
    ReadySupplemental,
    /// Sent after a successful resume
    Resumed,
    /// Session user changed
    UserUpdate,

    // Guild events
    /// Guild available, joined, or created
    GuildCreate,
    GuildUpdate,
    /// Left guild, kicked, or guild became unavailable
    GuildDelete,
    GuildBanAdd,
    GuildBanRemove,
    GuildEmojisUpdate,
    GuildRoleCreate,
    GuildRoleUpdate,
    GuildRoleDelete,

    // Member events
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    /// Reply batch to a member request
    GuildMembersChunk,
    /// Operation log for the visible member list window
    GuildMemberListUpdate,

    // Channel events
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    ChannelRecipientAdd,
    ChannelRecipientRemove,

    // Message events
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageDeleteBulk,
    MessageReactionAdd,
    MessageReactionRemove,
    MessageReactionRemoveAll,

    // Presence and voice
    PresenceUpdate,
    TypingStart,
    VoiceStateUpdate,

    // Relationships
    RelationshipAdd,
    RelationshipRemove,
}

impl GatewayEventType {
    /// Get the wire name of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::ReadySupplemental => "READY_SUPPLEMENTAL",
            Self::Resumed => "RESUMED",
            Self::UserUpdate => "USER_UPDATE",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::GuildBanAdd => "GUILD_BAN_ADD",
            Self::GuildBanRemove => "GUILD_BAN_REMOVE",
            Self::GuildEmojisUpdate => "GUILD_EMOJIS_UPDATE",
            Self::GuildRoleCreate => "GUILD_ROLE_CREATE",
            Self::GuildRoleUpdate => "GUILD_ROLE_UPDATE",
            Self::GuildRoleDelete => "GUILD_ROLE_DELETE",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::GuildMembersChunk => "GUILD_MEMBERS_CHUNK",
            Self::GuildMemberListUpdate => "GUILD_MEMBER_LIST_UPDATE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::ChannelRecipientAdd => "CHANNEL_RECIPIENT_ADD",
            Self::ChannelRecipientRemove => "CHANNEL_RECIPIENT_REMOVE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageDeleteBulk => "MESSAGE_DELETE_BULK",
            Self::MessageReactionAdd => "MESSAGE_REACTION_ADD",
            Self::MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::MessageReactionRemoveAll => "MESSAGE_REACTION_REMOVE_ALL",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::TypingStart => "TYPING_START",
            Self::VoiceStateUpdate => "VOICE_STATE_UPDATE",
            Self::RelationshipAdd => "RELATIONSHIP_ADD",
            Self::RelationshipRemove => "RELATIONSHIP_REMOVE",
        }
    }

    /// Whether this event belongs to the baseline handshake
    #[must_use]
    pub const fn is_session_event(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::ReadySupplemental | Self::Resumed
        )
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GatewayEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(Self::Ready),
            "READY_SUPPLEMENTAL" => Ok(Self::ReadySupplemental),
            "RESUMED" => Ok(Self::Resumed),
            "USER_UPDATE" => Ok(Self::UserUpdate),
            "GUILD_CREATE" => Ok(Self::GuildCreate),
            "GUILD_UPDATE" => Ok(Self::GuildUpdate),
            "GUILD_DELETE" => Ok(Self::GuildDelete),
            "GUILD_BAN_ADD" => Ok(Self::GuildBanAdd),
            "GUILD_BAN_REMOVE" => Ok(Self::GuildBanRemove),
            "GUILD_EMOJIS_UPDATE" => Ok(Self::GuildEmojisUpdate),
            "GUILD_ROLE_CREATE" => Ok(Self::GuildRoleCreate),
            "GUILD_ROLE_UPDATE" => Ok(Self::GuildRoleUpdate),
            "GUILD_ROLE_DELETE" => Ok(Self::GuildRoleDelete),
            "GUILD_MEMBER_ADD" => Ok(Self::GuildMemberAdd),
            "GUILD_MEMBER_UPDATE" => Ok(Self::GuildMemberUpdate),
            "GUILD_MEMBER_REMOVE" => Ok(Self::GuildMemberRemove),
            "GUILD_MEMBERS_CHUNK" => Ok(Self::GuildMembersChunk),
            "GUILD_MEMBER_LIST_UPDATE" => Ok(Self::GuildMemberListUpdate),
            "CHANNEL_CREATE" => Ok(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Ok(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Ok(Self::ChannelDelete),
            "CHANNEL_RECIPIENT_ADD" => Ok(Self::ChannelRecipientAdd),
            "CHANNEL_RECIPIENT_REMOVE" => Ok(Self::ChannelRecipientRemove),
            "MESSAGE_CREATE" => Ok(Self::MessageCreate),
            "MESSAGE_UPDATE" => Ok(Self::MessageUpdate),
            "MESSAGE_DELETE" => Ok(Self::MessageDelete),
            "MESSAGE_DELETE_BULK" => Ok(Self::MessageDeleteBulk),
            "MESSAGE_REACTION_ADD" => Ok(Self::MessageReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Ok(Self::MessageReactionRemove),
            "MESSAGE_REACTION_REMOVE_ALL" => Ok(Self::MessageReactionRemoveAll),
            "PRESENCE_UPDATE" => Ok(Self::PresenceUpdate),
            "TYPING_START" => Ok(Self::TypingStart),
            "VOICE_STATE_UPDATE" => Ok(Self::VoiceStateUpdate),
            "RELATIONSHIP_ADD" => Ok(Self::RelationshipAdd),
            "RELATIONSHIP_REMOVE" => Ok(Self::RelationshipRemove),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

/// Event name the engine has no handler for
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);
