//! Semantic events emitted to the surrounding application

use chrono::{DateTime, Utc};
use relay_core::{
    Emoji, GuildChannel, GuildRef, Member, Message, PrivateChannelRef, Reaction, Relationship,
    Role, Snowflake, User, UserRef, VoiceState,
};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::chunk::ChunkResult;

/// Higher-level event derived from one or more dispatch records.
///
/// Emitted after the store mutation it describes, so every entity it
/// references is already visible through the store.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    // Session
    Connect,
    Ready,
    Resumed,

    // Guilds
    GuildJoin(GuildRef),
    GuildAvailable(GuildRef),
    GuildUnavailable(GuildRef),
    GuildRemove(GuildRef),
    GuildUpdate(GuildRef),
    GuildEmojisUpdate {
        guild_id: Snowflake,
        before: Vec<Emoji>,
        after: Vec<Emoji>,
    },
    GuildRoleCreate {
        guild_id: Snowflake,
        role: Role,
    },
    GuildRoleUpdate {
        guild_id: Snowflake,
        before: Role,
        after: Role,
    },
    GuildRoleDelete {
        guild_id: Snowflake,
        role: Role,
    },

    // Members and users
    MemberJoin(Member),
    MemberRemove(Member),
    MemberUpdate {
        before: Member,
        after: Member,
    },
    MemberBan {
        guild_id: Snowflake,
        user: UserRef,
        member: Option<Member>,
    },
    MemberUnban {
        guild_id: Snowflake,
        user: UserRef,
    },
    UserUpdate {
        before: User,
        after: User,
    },

    // Channels
    GuildChannelCreate(GuildChannel),
    GuildChannelUpdate {
        before: GuildChannel,
        after: GuildChannel,
    },
    GuildChannelDelete(GuildChannel),
    PrivateChannelCreate(PrivateChannelRef),
    PrivateChannelUpdate(PrivateChannelRef),
    PrivateChannelDelete(PrivateChannelRef),
    GroupJoin {
        channel: PrivateChannelRef,
        user: UserRef,
    },
    GroupRemove {
        channel: PrivateChannelRef,
        user: UserRef,
    },

    // Messages
    Message(Message),
    MessageEdit {
        before: Message,
        after: Message,
    },
    /// Emitted for every edit, cached or not
    RawMessageEdit {
        message_id: Snowflake,
        channel_id: Snowflake,
        data: Value,
        cached: Option<Message>,
    },
    MessageDelete(Message),
    /// Emitted for every delete, cached or not
    RawMessageDelete {
        message_id: Snowflake,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        cached: Option<Message>,
    },
    BulkMessageDelete(Vec<Message>),
    RawBulkMessageDelete {
        message_ids: Vec<Snowflake>,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        cached: Vec<Message>,
    },
    ReactionAdd {
        message_id: Snowflake,
        channel_id: Snowflake,
        user_id: Snowflake,
        reaction: Reaction,
    },
    ReactionRemove {
        message_id: Snowflake,
        channel_id: Snowflake,
        user_id: Snowflake,
        reaction: Reaction,
    },
    ReactionClear {
        message: Message,
        reactions: Vec<Reaction>,
    },
    Typing {
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        user: UserRef,
        at: DateTime<Utc>,
    },

    // Voice
    VoiceStateUpdate {
        guild_id: Snowflake,
        member: Member,
        before: Option<VoiceState>,
        after: VoiceState,
    },

    // Relationships
    RelationshipAdd(Relationship),
    RelationshipUpdate {
        before: Relationship,
        after: Relationship,
    },
    RelationshipRemove(Relationship),

    // Chunking
    ChunkRequestResult(ChunkResult),
    RawMemberListUpdate(Value),
}

impl ClientEvent {
    /// Snake-case event name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Ready => "ready",
            Self::Resumed => "resumed",
            Self::GuildJoin(_) => "guild_join",
            Self::GuildAvailable(_) => "guild_available",
            Self::GuildUnavailable(_) => "guild_unavailable",
            Self::GuildRemove(_) => "guild_remove",
            Self::GuildUpdate(_) => "guild_update",
            Self::GuildEmojisUpdate { .. } => "guild_emojis_update",
            Self::GuildRoleCreate { .. } => "guild_role_create",
            Self::GuildRoleUpdate { .. } => "guild_role_update",
            Self::GuildRoleDelete { .. } => "guild_role_delete",
            Self::MemberJoin(_) => "member_join",
            Self::MemberRemove(_) => "member_remove",
            Self::MemberUpdate { .. } => "member_update",
            Self::MemberBan { .. } => "member_ban",
            Self::MemberUnban { .. } => "member_unban",
            Self::UserUpdate { .. } => "user_update",
            Self::GuildChannelCreate(_) => "guild_channel_create",
            Self::GuildChannelUpdate { .. } => "guild_channel_update",
            Self::GuildChannelDelete(_) => "guild_channel_delete",
            Self::PrivateChannelCreate(_) => "private_channel_create",
            Self::PrivateChannelUpdate(_) => "private_channel_update",
            Self::PrivateChannelDelete(_) => "private_channel_delete",
            Self::GroupJoin { .. } => "group_join",
            Self::GroupRemove { .. } => "group_remove",
            Self::Message(_) => "message",
            Self::MessageEdit { .. } => "message_edit",
            Self::RawMessageEdit { .. } => "raw_message_edit",
            Self::MessageDelete(_) => "message_delete",
            Self::RawMessageDelete { .. } => "raw_message_delete",
            Self::BulkMessageDelete(_) => "bulk_message_delete",
            Self::RawBulkMessageDelete { .. } => "raw_bulk_message_delete",
            Self::ReactionAdd { .. } => "reaction_add",
            Self::ReactionRemove { .. } => "reaction_remove",
            Self::ReactionClear { .. } => "reaction_clear",
            Self::Typing { .. } => "typing",
            Self::VoiceStateUpdate { .. } => "voice_state_update",
            Self::RelationshipAdd(_) => "relationship_add",
            Self::RelationshipUpdate { .. } => "relationship_update",
            Self::RelationshipRemove(_) => "relationship_remove",
            Self::ChunkRequestResult(_) => "chunk_request_result",
            Self::RawMemberListUpdate(_) => "raw_member_list_update",
        }
    }
}

/// Fan-out of semantic events to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn emit(&self, event: ClientEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => tracing::trace!(event = name, receivers, "Emitted event"),
            Err(_) => tracing::trace!(event = name, "No subscribers for event"),
        }
    }
}
