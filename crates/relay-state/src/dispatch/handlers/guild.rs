//! Guild lifecycle, bans, emojis and roles

use relay_core::{DomainError, Emoji, GuildRef, Snowflake};
use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::payloads::{
    GuildBanPayload, GuildDeletePayload, GuildEmojisUpdatePayload, GuildPayload,
    GuildRoleDeletePayload, GuildRolePayload,
};
use crate::events::ClientEvent;
use crate::mappers;
use crate::ready::announce_guild;
use crate::store::UnavailableKind;

impl EventDispatcher {
    pub(super) fn require_guild(&self, guild_id: Snowflake) -> StateResult<GuildRef> {
        self.ctx
            .store
            .get_guild(guild_id)
            .ok_or_else(|| DomainError::UnknownGuild(guild_id).into())
    }

    /// A guild became available, was joined, or was re-sent on request.
    ///
    /// A re-send of a guild that is already cached and was never reported
    /// unavailable only refreshes it.
    pub(crate) fn on_guild_create(&self, payload: &GuildPayload) -> StateResult<()> {
        let store = &self.ctx.store;
        let guild_id = payload.id;
        let existing = store.get_guild(guild_id);

        if payload.unavailable {
            match existing {
                Some(guild) => guild.write().unavailable = true,
                None => {
                    store.mark_unavailable(guild_id, UnavailableKind::Joined);
                    tracing::debug!(guild_id = %guild_id, "Requesting guild announced as unavailable");
                    self.spawn_guild_request(guild_id);
                }
            }
            return Ok(());
        }

        let flags = self.ctx.cache_flags();
        match existing {
            Some(guild) => {
                {
                    let mut guild = guild.write();
                    mappers::apply_guild_metadata(&mut guild, payload);
                    mappers::apply_guild_collections(store, &mut guild, payload, flags);
                }
                if !store.is_unavailable(guild_id) {
                    tracing::trace!(guild_id = %guild_id, "Refreshed cached guild");
                    return Ok(());
                }
            }
            None => store.add_guild(mappers::build_guild(store, payload, flags).into_ref()),
        }

        let chunk = self.ctx.guild_needs_chunking(guild_id);
        let subscribe = self.ctx.guild_needs_subscribing(guild_id);
        if chunk || subscribe {
            self.sequencer
                .hydrate_guild(Arc::clone(&self.ctx), guild_id, chunk, subscribe);
        } else {
            announce_guild(&self.ctx, guild_id);
        }
        Ok(())
    }

    pub(crate) fn on_guild_update(&self, payload: &GuildPayload) -> StateResult<()> {
        let guild = self.require_guild(payload.id)?;
        {
            let mut g = guild.write();
            mappers::apply_guild_metadata(&mut g, payload);
            mappers::apply_guild_collections(&self.ctx.store, &mut g, payload, self.ctx.cache_flags());
        }
        self.ctx.events.emit(ClientEvent::GuildUpdate(guild));
        Ok(())
    }

    pub(crate) fn on_guild_delete(&self, payload: &GuildDeletePayload) -> StateResult<()> {
        let store = &self.ctx.store;
        let guild = self.require_guild(payload.id)?;

        if payload.unavailable {
            guild.write().unavailable = true;
            // Its return is an availability, not a join
            store.mark_unavailable(payload.id, UnavailableKind::Existing);
            tracing::info!(guild_id = %payload.id, "Guild became unavailable");
            self.ctx.events.emit(ClientEvent::GuildUnavailable(guild));
            return Ok(());
        }

        let purged = store.purge_guild_messages(payload.id);
        store.remove_guild(payload.id);
        tracing::info!(guild_id = %payload.id, purged_messages = purged, "Guild removed");
        self.ctx.events.emit(ClientEvent::GuildRemove(guild));
        Ok(())
    }

    pub(crate) fn on_guild_ban_add(&self, payload: &GuildBanPayload) -> StateResult<()> {
        let guild = self.require_guild(payload.guild_id)?;
        let user = self.ctx.store.upsert_user(&payload.user);
        let member = guild.read().get_member(payload.user.id).cloned();

        self.ctx.events.emit(ClientEvent::MemberBan {
            guild_id: payload.guild_id,
            user,
            member,
        });
        Ok(())
    }

    pub(crate) fn on_guild_ban_remove(&self, payload: &GuildBanPayload) -> StateResult<()> {
        self.require_guild(payload.guild_id)?;
        let user = self.ctx.store.upsert_user(&payload.user);
        self.ctx.events.emit(ClientEvent::MemberUnban {
            guild_id: payload.guild_id,
            user,
        });
        Ok(())
    }

    pub(crate) fn on_guild_emojis_update(&self, payload: &GuildEmojisUpdatePayload) -> StateResult<()> {
        let guild = self.require_guild(payload.guild_id)?;
        let after: Vec<Emoji> = payload
            .emojis
            .iter()
            .map(|e| mappers::emoji_from_payload(payload.guild_id, e))
            .collect();

        let before = std::mem::replace(&mut guild.write().emojis, after.clone());
        self.ctx.store.index_emojis(payload.guild_id, &after);

        self.ctx.events.emit(ClientEvent::GuildEmojisUpdate {
            guild_id: payload.guild_id,
            before,
            after,
        });
        Ok(())
    }

    pub(crate) fn on_guild_role_create(&self, payload: GuildRolePayload) -> StateResult<()> {
        let guild = self.require_guild(payload.guild_id)?;
        guild.write().add_role(payload.role.clone());
        self.ctx.events.emit(ClientEvent::GuildRoleCreate {
            guild_id: payload.guild_id,
            role: payload.role,
        });
        Ok(())
    }

    pub(crate) fn on_guild_role_update(&self, payload: GuildRolePayload) -> StateResult<()> {
        let guild = self.require_guild(payload.guild_id)?;
        let before = guild
            .write()
            .roles
            .get_mut(&payload.role.id)
            .map(|role| std::mem::replace(role, payload.role.clone()));

        match before {
            Some(before) => self.ctx.events.emit(ClientEvent::GuildRoleUpdate {
                guild_id: payload.guild_id,
                before,
                after: payload.role,
            }),
            None => tracing::debug!(
                guild_id = %payload.guild_id,
                role_id = %payload.role.id,
                "Update for unknown role"
            ),
        }
        Ok(())
    }

    pub(crate) fn on_guild_role_delete(&self, payload: &GuildRoleDeletePayload) -> StateResult<()> {
        let guild = self.require_guild(payload.guild_id)?;
        let removed = guild.write().remove_role(payload.role_id);

        match removed {
            Some(role) => self.ctx.events.emit(ClientEvent::GuildRoleDelete {
                guild_id: payload.guild_id,
                role,
            }),
            None => tracing::debug!(
                guild_id = %payload.guild_id,
                role_id = %payload.role_id,
                "Delete for unknown role"
            ),
        }
        Ok(())
    }
}
