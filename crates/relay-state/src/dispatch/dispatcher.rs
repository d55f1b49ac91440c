//! Event dispatcher - routes dispatch records to their handlers
//!
//! Records are applied strictly one at a time in delivery order. Handlers
//! never wait on a later record; anything that must wait is spawned.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::context::StateContext;
use crate::error::{StateError, StateResult};
use crate::events::payloads::ReadyPayload;
use crate::events::{GatewayEventType, GatewayRecord};
use crate::ready::ReadinessSequencer;

pub struct EventDispatcher {
    pub(super) ctx: Arc<StateContext>,
    pub(super) sequencer: Arc<ReadinessSequencer>,
    /// READY waiting for its supplemental half
    pub(super) pending_ready: Mutex<Option<ReadyPayload>>,
}

pub(super) fn decode<T: DeserializeOwned>(data: Value) -> StateResult<T> {
    serde_json::from_value(data).map_err(StateError::from)
}

impl EventDispatcher {
    pub fn new(ctx: Arc<StateContext>, sequencer: Arc<ReadinessSequencer>) -> Self {
        Self {
            ctx,
            sequencer,
            pending_ready: Mutex::new(None),
        }
    }

    /// Apply one record.
    ///
    /// Unknown event names are ignored. Errors are logged here at the level
    /// their class calls for and returned for inspection; none is fatal.
    pub fn dispatch(&self, record: GatewayRecord) -> StateResult<()> {
        let Some(event_type) = record.event_type() else {
            tracing::debug!(event_type = %record.t, "Ignoring unhandled event");
            return Ok(());
        };

        tracing::trace!(event_type = %event_type, "Dispatching event");
        let result = self.route(event_type, record.d);
        if let Err(e) = &result {
            e.log(event_type.as_str());
        }
        result
    }

    fn route(&self, event_type: GatewayEventType, data: Value) -> StateResult<()> {
        use GatewayEventType as E;

        match event_type {
            // Session
            E::Ready => self.on_ready(decode(data)?),
            E::ReadySupplemental => self.on_ready_supplemental(decode(data)?),
            E::Resumed => self.on_resumed(),
            E::UserUpdate => self.on_user_update(&decode(data)?),

            // Guilds
            E::GuildCreate => self.on_guild_create(&decode(data)?),
            E::GuildUpdate => self.on_guild_update(&decode(data)?),
            E::GuildDelete => self.on_guild_delete(&decode(data)?),
            E::GuildBanAdd => self.on_guild_ban_add(&decode(data)?),
            E::GuildBanRemove => self.on_guild_ban_remove(&decode(data)?),
            E::GuildEmojisUpdate => self.on_guild_emojis_update(&decode(data)?),
            E::GuildRoleCreate => self.on_guild_role_create(decode(data)?),
            E::GuildRoleUpdate => self.on_guild_role_update(decode(data)?),
            E::GuildRoleDelete => self.on_guild_role_delete(&decode(data)?),

            // Members
            E::GuildMemberAdd => self.on_guild_member_add(&decode(data)?),
            E::GuildMemberUpdate => self.on_guild_member_update(&decode(data)?),
            E::GuildMemberRemove => self.on_guild_member_remove(&decode(data)?),
            E::GuildMembersChunk => self.on_guild_members_chunk(decode(data)?),
            E::GuildMemberListUpdate => self.on_guild_member_list_update(data),

            // Channels
            E::ChannelCreate => self.on_channel_create(&decode(data)?),
            E::ChannelUpdate => self.on_channel_update(&decode(data)?),
            E::ChannelDelete => self.on_channel_delete(&decode(data)?),
            E::ChannelRecipientAdd => self.on_channel_recipient_add(&decode(data)?),
            E::ChannelRecipientRemove => self.on_channel_recipient_remove(&decode(data)?),

            // Messages
            E::MessageCreate => self.on_message_create(&decode(data)?),
            E::MessageUpdate => self.on_message_update(data),
            E::MessageDelete => self.on_message_delete(&decode(data)?),
            E::MessageDeleteBulk => self.on_message_delete_bulk(decode(data)?),
            E::MessageReactionAdd => self.on_reaction_add(&decode(data)?),
            E::MessageReactionRemove => self.on_reaction_remove(&decode(data)?),
            E::MessageReactionRemoveAll => self.on_reaction_remove_all(&decode(data)?),

            // Presence, typing and voice
            E::PresenceUpdate => self.on_presence_update(&decode(data)?),
            E::TypingStart => self.on_typing_start(&decode(data)?),
            E::VoiceStateUpdate => self.on_voice_state_update(&decode(data)?),

            // Relationships
            E::RelationshipAdd => self.on_relationship_add(&decode(data)?),
            E::RelationshipRemove => self.on_relationship_remove(&decode(data)?),
        }
    }

    /// Apply records from the transport until it closes
    pub async fn run(&self, mut records: mpsc::Receiver<GatewayRecord>) {
        tracing::info!("Event dispatcher started");
        while let Some(record) = records.recv().await {
            // Already logged; one bad record never stops the stream
            let _ = self.dispatch(record);
        }
        tracing::info!("Event dispatcher stopped");
    }

    /// Ask the server for a guild in the background
    pub(super) fn spawn_guild_request(&self, guild_id: relay_core::Snowflake) {
        let commands = Arc::clone(&self.ctx.commands);
        tokio::spawn(async move {
            if let Err(e) = commands.request_guild(guild_id).await {
                StateError::from(e).log("GUILD_CREATE");
            }
        });
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("phase", &self.sequencer.phase())
            .finish_non_exhaustive()
    }
}
