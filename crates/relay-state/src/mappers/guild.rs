//! Guild payload -> entity mapper

use relay_common::MemberCacheFlags;
use relay_core::{Emoji, Guild, GuildChannel, Snowflake, VoiceState};

use super::member::{apply_presence, member_from_payload, merge_member};
use crate::events::payloads::{ChannelPayload, EmojiPayload, GuildPayload, VoiceStatePayload};
use crate::store::EntityStore;

/// Convert a guild channel payload; the owning guild wins over the payload's own id
pub fn guild_channel_from_payload(guild_id: Snowflake, payload: &ChannelPayload) -> GuildChannel {
    GuildChannel {
        id: payload.id,
        guild_id,
        kind: payload.channel_type(),
        name: payload.name.clone().unwrap_or_default(),
        position: payload.position,
        topic: payload.topic.clone(),
        parent_id: payload.parent_id,
        nsfw: payload.nsfw,
        last_message_id: payload.last_message_id,
    }
}

pub fn emoji_from_payload(guild_id: Snowflake, payload: &EmojiPayload) -> Emoji {
    Emoji {
        id: payload.id,
        guild_id,
        name: payload.name.clone(),
        animated: payload.animated,
        managed: payload.managed,
        require_colons: payload.require_colons,
        available: payload.available,
        role_ids: payload.roles.clone(),
    }
}

impl From<&VoiceStatePayload> for VoiceState {
    fn from(payload: &VoiceStatePayload) -> Self {
        VoiceState {
            user_id: payload.user_id,
            channel_id: payload.channel_id,
            session_id: payload.session_id.clone(),
            deaf: payload.deaf,
            mute: payload.mute,
            self_deaf: payload.self_deaf,
            self_mute: payload.self_mute,
            self_stream: payload.self_stream,
            self_video: payload.self_video,
            suppress: payload.suppress,
        }
    }
}

/// Scalar guild fields; absent fields keep their cached value
pub fn apply_guild_metadata(guild: &mut Guild, payload: &GuildPayload) {
    if let Some(name) = &payload.name {
        guild.name.clone_from(name);
        guild.icon.clone_from(&payload.icon);
        guild.description.clone_from(&payload.description);
    }
    if let Some(owner_id) = payload.owner_id {
        guild.owner_id = owner_id;
    }
    if let Some(large) = payload.large {
        guild.large = large;
    }
    if payload.member_count.is_some() {
        guild.member_count = payload.member_count;
    }
    guild.unavailable = payload.unavailable;
}

/// Channels, roles, emojis, members, presences and voice states.
///
/// Collections the payload carries replace the cached ones. Members are
/// merged into existing records; new ones are only cached for the session
/// user or when joined members are cached. Presences only touch members
/// already cached.
pub fn apply_guild_collections(
    store: &EntityStore,
    guild: &mut Guild,
    payload: &GuildPayload,
    flags: MemberCacheFlags,
) {
    let guild_id = guild.id;

    if let Some(channels) = &payload.channels {
        guild.channels = channels
            .iter()
            .map(|c| (c.id, guild_channel_from_payload(guild_id, c)))
            .collect();
    }
    if let Some(roles) = &payload.roles {
        guild.roles = roles.iter().map(|r| (r.id, r.clone())).collect();
    }
    if let Some(emojis) = &payload.emojis {
        guild.emojis = emojis
            .iter()
            .map(|e| emoji_from_payload(guild_id, e))
            .collect();
        store.index_emojis(guild_id, &guild.emojis);
    }

    let self_id = store.self_id();
    for member_payload in &payload.members {
        let Some(user_payload) = &member_payload.user else {
            tracing::trace!(guild_id = %guild_id, "Skipping member without user object");
            continue;
        };
        let user = store.upsert_user(user_payload);

        if let Some(existing) = guild.get_member_mut(user_payload.id) {
            merge_member(existing, member_payload);
            if let Some(presence) = &member_payload.presence {
                apply_presence(existing, presence);
            }
        } else if flags.contains(MemberCacheFlags::JOINED) || self_id == Some(user_payload.id) {
            guild.add_member(member_from_payload(guild_id, user, member_payload));
        }
    }

    for presence in &payload.presences {
        let Some(user_id) = presence.user_id() else {
            continue;
        };
        if let Some(member) = guild.get_member_mut(user_id) {
            apply_presence(member, presence);
        }
    }

    for state in &payload.voice_states {
        guild.update_voice_state(VoiceState::from(state));
    }
}

/// Build a new guild from a full payload
pub fn build_guild(store: &EntityStore, payload: &GuildPayload, flags: MemberCacheFlags) -> Guild {
    let mut guild = Guild {
        id: payload.id,
        ..Guild::default()
    };
    apply_guild_metadata(&mut guild, payload);
    apply_guild_collections(store, &mut guild, payload, flags);
    guild
}
