//! Entity store - the canonical in-memory mirror of remote state
//!
//! Mutated only from the dispatch path. Background tasks read through the
//! same handles; writes they make are limited to guild flags.
//!
//! No `DashMap` guard is ever held while an entity lock is taken.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use relay_core::{
    Emoji, GuildChannel, GuildRef, Message, PrivateChannelRef, Relationship, Snowflake, User,
    UserRef,
};
use std::sync::Arc;

use super::messages::MessageRing;
use super::private_channels::PrivateChannelCache;
use super::users::UserTable;
use crate::events::payloads::UserPayload;
use crate::mappers;

/// Why a guild is in the unavailable registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableKind {
    /// Listed as unavailable in the baseline snapshot
    Existing,
    /// Announced by a GUILD_CREATE before its data arrived
    Joined,
}

/// Result of a channel lookup across private and guild channels
#[derive(Debug, Clone)]
pub enum CachedChannel {
    Private(PrivateChannelRef),
    Guild(GuildChannel),
}

impl CachedChannel {
    pub fn id(&self) -> Snowflake {
        match self {
            Self::Private(channel) => channel.read().id,
            Self::Guild(channel) => channel.id,
        }
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Private(_) => None,
            Self::Guild(channel) => Some(channel.guild_id),
        }
    }
}

pub struct EntityStore {
    me: RwLock<Option<UserRef>>,
    users: UserTable,
    guilds: DashMap<Snowflake, GuildRef>,
    emojis: DashMap<Snowflake, Emoji>,
    unavailable: DashMap<Snowflake, UnavailableKind>,
    private_channels: Mutex<PrivateChannelCache>,
    relationships: DashMap<Snowflake, Relationship>,
    messages: Mutex<MessageRing>,
}

impl EntityStore {
    pub fn new(message_capacity: usize) -> Self {
        Self {
            me: RwLock::new(None),
            users: UserTable::new(),
            guilds: DashMap::new(),
            emojis: DashMap::new(),
            unavailable: DashMap::new(),
            private_channels: Mutex::new(PrivateChannelCache::default()),
            relationships: DashMap::new(),
            messages: Mutex::new(MessageRing::new(message_capacity)),
        }
    }

    // =========================================================================
    // Session user
    // =========================================================================

    /// Install the session user; held strongly for the session's lifetime
    pub fn set_me(&self, user: UserRef) {
        self.users.insert(&user);
        *self.me.write() = Some(user);
    }

    pub fn me(&self) -> Option<UserRef> {
        self.me.read().clone()
    }

    pub fn self_id(&self) -> Option<Snowflake> {
        self.me.read().as_ref().map(|user| user.read().id)
    }

    pub fn is_me(&self, user_id: Snowflake) -> bool {
        self.self_id() == Some(user_id)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Canonical user for the payload's id, merging the payload in place.
    ///
    /// The session user is returned untouched; it only changes through
    /// USER_UPDATE.
    pub fn upsert_user(&self, payload: &UserPayload) -> UserRef {
        self.upsert_user_tracked(payload).0
    }

    /// Like [`Self::upsert_user`], also returning the user before and after
    /// when an existing record changed
    pub fn upsert_user_tracked(&self, payload: &UserPayload) -> (UserRef, Option<(User, User)>) {
        if let Some(me) = self.me() {
            if me.read().id == payload.id {
                return (me, None);
            }
        }

        if let Some(existing) = self.users.get(payload.id) {
            let change = {
                let mut user = existing.write();
                let before = user.clone();
                mappers::apply_user(&mut user, payload).then(|| (before, user.clone()))
            };
            return (existing, change);
        }

        let user = mappers::user_from_payload(payload).into_ref();
        if !user.read().is_placeholder() {
            self.users.insert(&user);
        }
        (user, None)
    }

    pub fn get_user(&self, id: Snowflake) -> Option<UserRef> {
        if let Some(me) = self.me() {
            if me.read().id == id {
                return Some(me);
            }
        }
        self.users.get(id)
    }

    /// Live users, including the session user
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // =========================================================================
    // Guilds
    // =========================================================================

    pub fn get_guild(&self, id: Snowflake) -> Option<GuildRef> {
        self.guilds.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert a guild and index its emojis
    pub fn add_guild(&self, guild: GuildRef) {
        let (id, emojis) = {
            let g = guild.read();
            (g.id, g.emojis.clone())
        };
        self.index_emojis(id, &emojis);
        self.guilds.insert(id, guild);
    }

    /// Remove a guild, purging its entries from the global indexes first
    pub fn remove_guild(&self, id: Snowflake) -> Option<GuildRef> {
        self.emojis.retain(|_, emoji| emoji.guild_id != id);
        self.unavailable.remove(&id);
        self.guilds.remove(&id).map(|(_, guild)| guild)
    }

    pub fn guilds(&self) -> Vec<GuildRef> {
        self.guilds
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn guild_ids(&self) -> Vec<Snowflake> {
        self.guilds.iter().map(|entry| *entry.key()).collect()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    // =========================================================================
    // Emojis
    // =========================================================================

    /// Replace the indexed emojis of one guild
    pub fn index_emojis(&self, guild_id: Snowflake, emojis: &[Emoji]) {
        self.emojis.retain(|_, emoji| emoji.guild_id != guild_id);
        for emoji in emojis {
            self.emojis.insert(emoji.id, emoji.clone());
        }
    }

    pub fn get_emoji(&self, id: Snowflake) -> Option<Emoji> {
        self.emojis.get(&id).map(|entry| entry.value().clone())
    }

    pub fn emoji_count(&self) -> usize {
        self.emojis.len()
    }

    // =========================================================================
    // Unavailable guilds
    // =========================================================================

    pub fn mark_unavailable(&self, id: Snowflake, kind: UnavailableKind) {
        self.unavailable.insert(id, kind);
    }

    pub fn take_unavailable(&self, id: Snowflake) -> Option<UnavailableKind> {
        self.unavailable.remove(&id).map(|(_, kind)| kind)
    }

    pub fn unavailable_kind(&self, id: Snowflake) -> Option<UnavailableKind> {
        self.unavailable.get(&id).map(|entry| *entry.value())
    }

    pub fn is_unavailable(&self, id: Snowflake) -> bool {
        self.unavailable.contains_key(&id)
    }

    // =========================================================================
    // Private channels
    // =========================================================================

    /// Look up a private channel, promoting it to most recently used
    pub fn get_private_channel(&self, id: Snowflake) -> Option<PrivateChannelRef> {
        self.private_channels.lock().get(id)
    }

    /// Direct message channel with a user
    pub fn get_dm_channel(&self, user_id: Snowflake) -> Option<PrivateChannelRef> {
        self.private_channels.lock().get_by_user(user_id)
    }

    /// Insert or overwrite; returns the channel evicted to make room
    pub fn add_private_channel(&self, channel: PrivateChannelRef) -> Option<PrivateChannelRef> {
        self.private_channels.lock().insert(channel)
    }

    pub fn remove_private_channel(&self, id: Snowflake) -> Option<PrivateChannelRef> {
        self.private_channels.lock().remove(id)
    }

    pub fn private_channels(&self) -> Vec<PrivateChannelRef> {
        self.private_channels.lock().channels()
    }

    pub fn private_channel_count(&self) -> usize {
        self.private_channels.lock().len()
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Private channels first, then every guild's channels
    pub fn get_channel(&self, id: Snowflake) -> Option<CachedChannel> {
        if let Some(channel) = self.get_private_channel(id) {
            return Some(CachedChannel::Private(channel));
        }

        self.guilds()
            .into_iter()
            .find_map(|guild| guild.read().get_channel(id).cloned())
            .map(CachedChannel::Guild)
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    pub fn add_relationship(&self, user_id: Snowflake, relationship: Relationship) -> Option<Relationship> {
        self.relationships.insert(user_id, relationship)
    }

    pub fn get_relationship(&self, user_id: Snowflake) -> Option<Relationship> {
        self.relationships
            .get(&user_id)
            .map(|entry| entry.value().clone())
    }

    pub fn remove_relationship(&self, user_id: Snowflake) -> Option<Relationship> {
        self.relationships.remove(&user_id).map(|(_, r)| r)
    }

    pub fn relationships(&self) -> Vec<Relationship> {
        self.relationships
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub fn record_message(&self, message: Message) {
        self.messages.lock().record(message);
    }

    pub fn get_message(&self, id: Snowflake) -> Option<Message> {
        self.messages.lock().get(id).cloned()
    }

    /// Most recent cached message matching `predicate`
    pub fn find_message<P>(&self, predicate: P) -> Option<Message>
    where
        P: FnMut(&Message) -> bool,
    {
        self.messages.lock().find(predicate).cloned()
    }

    /// Mutate a cached message in place
    pub fn update_message<R>(&self, id: Snowflake, f: impl FnOnce(&mut Message) -> R) -> Option<R> {
        let mut ring = self.messages.lock();
        ring.find_mut(|m| m.id == id).map(f)
    }

    pub fn remove_message(&self, id: Snowflake) -> Option<Message> {
        self.messages.lock().remove(id)
    }

    pub fn remove_messages(&self, ids: &[Snowflake]) -> Vec<Message> {
        self.messages.lock().remove_many(ids)
    }

    pub fn purge_guild_messages(&self, guild_id: Snowflake) -> usize {
        self.messages.lock().purge_guild(guild_id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Discard everything, including the session user
    pub fn clear(&self) {
        *self.me.write() = None;
        self.users.clear();
        self.guilds.clear();
        self.emojis.clear();
        self.unavailable.clear();
        self.private_channels.lock().clear();
        self.relationships.clear();
        self.messages.lock().clear();
        tracing::debug!("Entity store cleared");
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("guilds", &self.guilds.len())
            .field("users", &self.users)
            .field("emojis", &self.emojis.len())
            .field("unavailable", &self.unavailable.len())
            .finish_non_exhaustive()
    }
}
