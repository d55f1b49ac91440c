//! MESSAGE_* and MESSAGE_REACTION_* handlers
//!
//! Raw variants are emitted for every record; the cached variants only when
//! the message is in the ring buffer.

use relay_core::{PartialEmoji, Snowflake};
use serde_json::Value;

use crate::dispatch::dispatcher::decode;
use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::payloads::{
    MessageDeleteBulkPayload, MessageDeletePayload, MessagePayload, MessageUpdatePayload,
    ReactionClearPayload, ReactionPayload,
};
use crate::events::ClientEvent;
use crate::mappers;
use crate::store::CachedChannel;

impl EventDispatcher {
    pub(crate) fn on_message_create(&self, payload: &MessagePayload) -> StateResult<()> {
        let store = &self.ctx.store;
        if let Some(guild_id) = payload.guild_id {
            if store.is_unavailable(guild_id) {
                tracing::debug!(guild_id = %guild_id, "Dropping message for unavailable guild");
                return Ok(());
            }
        }

        let message = mappers::message_from_payload(store, payload);
        store.record_message(message.clone());
        self.touch_channel(payload.channel_id, payload.guild_id, payload.id);

        self.ctx.events.emit(ClientEvent::Message(message));
        Ok(())
    }

    pub(crate) fn on_message_update(&self, data: Value) -> StateResult<()> {
        let payload: MessageUpdatePayload = decode(data.clone())?;
        let store = &self.ctx.store;
        let cached = store.get_message(payload.id);

        self.ctx.events.emit(ClientEvent::RawMessageEdit {
            message_id: payload.id,
            channel_id: payload.channel_id,
            data,
            cached: cached.clone(),
        });

        let Some(before) = cached else {
            return Ok(());
        };
        let after = store.update_message(payload.id, |message| {
            mappers::apply_message_update(message, &payload);
            message.clone()
        });
        if let Some(after) = after {
            self.ctx
                .events
                .emit(ClientEvent::MessageEdit { before, after });
        }
        Ok(())
    }

    pub(crate) fn on_message_delete(&self, payload: &MessageDeletePayload) -> StateResult<()> {
        let cached = self.ctx.store.remove_message(payload.id);

        self.ctx.events.emit(ClientEvent::RawMessageDelete {
            message_id: payload.id,
            channel_id: payload.channel_id,
            guild_id: payload.guild_id,
            cached: cached.clone(),
        });
        if let Some(message) = cached {
            self.ctx.events.emit(ClientEvent::MessageDelete(message));
        }
        Ok(())
    }

    pub(crate) fn on_message_delete_bulk(&self, payload: MessageDeleteBulkPayload) -> StateResult<()> {
        let cached = self.ctx.store.remove_messages(&payload.ids);

        self.ctx.events.emit(ClientEvent::RawBulkMessageDelete {
            message_ids: payload.ids,
            channel_id: payload.channel_id,
            guild_id: payload.guild_id,
            cached: cached.clone(),
        });
        if !cached.is_empty() {
            self.ctx.events.emit(ClientEvent::BulkMessageDelete(cached));
        }
        Ok(())
    }

    pub(crate) fn on_reaction_add(&self, payload: &ReactionPayload) -> StateResult<()> {
        let emoji = self.resolve_emoji(&payload.emoji);
        let is_me = self.ctx.store.is_me(payload.user_id);

        let reaction = self
            .ctx
            .store
            .update_message(payload.message_id, |m| m.add_reaction(emoji, is_me));
        match reaction {
            Some(reaction) => self.ctx.events.emit(ClientEvent::ReactionAdd {
                message_id: payload.message_id,
                channel_id: payload.channel_id,
                user_id: payload.user_id,
                reaction,
            }),
            None => {
                tracing::trace!(message_id = %payload.message_id, "Reaction on uncached message");
            }
        }
        Ok(())
    }

    pub(crate) fn on_reaction_remove(&self, payload: &ReactionPayload) -> StateResult<()> {
        let emoji = self.resolve_emoji(&payload.emoji);
        let is_me = self.ctx.store.is_me(payload.user_id);

        let reaction = self
            .ctx
            .store
            .update_message(payload.message_id, |m| m.remove_reaction(&emoji, is_me))
            .flatten();
        if let Some(reaction) = reaction {
            self.ctx.events.emit(ClientEvent::ReactionRemove {
                message_id: payload.message_id,
                channel_id: payload.channel_id,
                user_id: payload.user_id,
                reaction,
            });
        }
        Ok(())
    }

    pub(crate) fn on_reaction_remove_all(&self, payload: &ReactionClearPayload) -> StateResult<()> {
        let cleared = self.ctx.store.update_message(payload.message_id, |m| {
            let reactions = m.clear_reactions();
            (m.clone(), reactions)
        });
        if let Some((message, reactions)) = cleared {
            self.ctx
                .events
                .emit(ClientEvent::ReactionClear { message, reactions });
        }
        Ok(())
    }

    /// Fill a custom emoji in from the emoji index
    fn resolve_emoji(&self, emoji: &PartialEmoji) -> PartialEmoji {
        emoji
            .id
            .and_then(|id| self.ctx.store.get_emoji(id))
            .map_or_else(|| emoji.clone(), |known| PartialEmoji::from(&known))
    }

    fn touch_channel(&self, channel_id: Snowflake, guild_id: Option<Snowflake>, message_id: Snowflake) {
        let store = &self.ctx.store;
        match guild_id {
            Some(guild_id) => {
                if let Some(guild) = store.get_guild(guild_id) {
                    if let Some(channel) = guild.write().channels.get_mut(&channel_id) {
                        channel.last_message_id = Some(message_id);
                    }
                }
            }
            None => {
                if let Some(CachedChannel::Private(channel)) = store.get_channel(channel_id) {
                    channel.write().last_message_id = Some(message_id);
                }
            }
        }
    }
}
