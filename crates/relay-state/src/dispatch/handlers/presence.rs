//! PRESENCE_UPDATE, TYPING_START and VOICE_STATE_UPDATE

use chrono::{DateTime, Utc};
use relay_common::MemberCacheFlags;
use relay_core::{DomainError, Member, VoiceState};
use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::payloads::{PresencePayload, TypingStartPayload, VoiceStatePayload};
use crate::events::ClientEvent;
use crate::mappers;

impl EventDispatcher {
    /// Presence changes of guild members.
    ///
    /// An online-only cache drops members going offline; unknown members are
    /// built from the presence when it carries a full user.
    pub(crate) fn on_presence_update(&self, payload: &PresencePayload) -> StateResult<()> {
        let Some(guild_id) = payload.guild_id else {
            tracing::trace!("Ignoring presence outside a guild");
            return Ok(());
        };
        let user_payload = payload.user.as_ref().ok_or(DomainError::MissingField("user"))?;
        let guild = self.require_guild(guild_id)?;

        let store = &self.ctx.store;
        let flags = self.ctx.cache_flags();
        let user_id = user_payload.id;
        let is_me = store.is_me(user_id);

        let mut g = guild.write();
        let (before, after, user_change) = match g.get_member_mut(user_id) {
            Some(member) => {
                let before = member.clone();
                mappers::apply_presence(member, payload);
                // The session user only changes through USER_UPDATE
                let user_change = if is_me {
                    None
                } else {
                    let mut user = member.user.write();
                    let snapshot = user.clone();
                    mappers::apply_partial_user(&mut user, user_payload)
                        .then(|| (snapshot, user.clone()))
                };
                let after = member.clone();

                if !is_me && flags.online_only() && after.presence.status.is_offline() {
                    g.remove_member(user_id);
                    tracing::trace!(guild_id = %guild_id, user_id = %user_id, "Evicted offline member");
                }
                (before, after, user_change)
            }
            None => {
                let full = user_payload
                    .to_full()
                    .ok_or(DomainError::UnknownMember { guild_id, user_id })?;
                let mut member = Member::new(guild_id, store.upsert_user(&full));
                let before = member.clone();
                mappers::apply_presence(&mut member, payload);

                let offline = member.presence.status.is_offline();
                if flags.contains(MemberCacheFlags::ONLINE) && !(flags.online_only() && offline) {
                    g.add_member(member.clone());
                }
                (before, member, None)
            }
        };
        drop(g);

        if let Some((before, after)) = user_change {
            self.ctx.events.emit(ClientEvent::UserUpdate { before, after });
        }
        self.ctx
            .events
            .emit(ClientEvent::MemberUpdate { before, after });
        Ok(())
    }

    pub(crate) fn on_typing_start(&self, payload: &TypingStartPayload) -> StateResult<()> {
        let store = &self.ctx.store;
        let user_id = payload.user_id;

        let found = match payload.guild_id {
            Some(guild_id) => {
                let guild = self.require_guild(guild_id)?;
                let cached = guild
                    .read()
                    .get_member(user_id)
                    .map(|m| Arc::clone(&m.user));
                cached.or_else(|| {
                    payload
                        .member
                        .as_ref()
                        .and_then(|m| m.user.as_ref())
                        .map(|u| store.upsert_user(u))
                })
            }
            None => store.get_private_channel(payload.channel_id).and_then(|channel| {
                channel
                    .read()
                    .recipients()
                    .into_iter()
                    .find(|u| u.read().id == user_id)
            }),
        };

        let Some(user) = found.or_else(|| store.get_user(user_id)) else {
            return Err(match payload.guild_id {
                Some(guild_id) => DomainError::UnknownMember { guild_id, user_id },
                None => DomainError::UnknownChannel(payload.channel_id),
            }
            .into());
        };

        let at = DateTime::<Utc>::from_timestamp(payload.timestamp, 0).unwrap_or_else(Utc::now);
        self.ctx.events.emit(ClientEvent::Typing {
            channel_id: payload.channel_id,
            guild_id: payload.guild_id,
            user,
            at,
        });
        Ok(())
    }

    /// Voice state changes.
    ///
    /// The state is recorded even when the member is unknown. A voice cache
    /// keeps members in a channel; a voice-only cache also drops them when
    /// they leave (never the session user).
    pub(crate) fn on_voice_state_update(&self, payload: &VoiceStatePayload) -> StateResult<()> {
        let Some(guild_id) = payload.guild_id else {
            tracing::trace!("Ignoring voice state outside a guild");
            return Ok(());
        };
        let guild = self.require_guild(guild_id)?;

        let store = &self.ctx.store;
        let flags = self.ctx.cache_flags();
        let user_id = payload.user_id;
        let is_me = store.is_me(user_id);
        let sent_member = payload.member.as_ref().and_then(|m| {
            let user = store.upsert_user(m.user.as_ref()?);
            Some(mappers::member_from_payload(guild_id, user, m))
        });

        let after = VoiceState::from(payload);
        let (member, before) = {
            let mut g = guild.write();
            let before = g.update_voice_state(after.clone());
            let Some(member) = g.get_member(user_id).cloned().or(sent_member) else {
                return Err(DomainError::UnknownMember { guild_id, user_id }.into());
            };

            if flags.contains(MemberCacheFlags::VOICE) {
                if payload.channel_id.is_none() {
                    if flags.voice_only() && !is_me {
                        g.remove_member(user_id);
                    }
                } else {
                    g.add_member(member.clone());
                }
            }
            (member, before)
        };

        self.ctx.events.emit(ClientEvent::VoiceStateUpdate {
            guild_id,
            member,
            before,
            after,
        });
        Ok(())
    }
}
