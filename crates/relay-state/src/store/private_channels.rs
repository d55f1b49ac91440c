//! Private channel cache
//!
//! Bounded, least-recently-accessed eviction, with a secondary index from the
//! counterpart user of a direct message to its channel. Both indexes change
//! together.

use relay_core::{PrivateChannelRef, Snowflake};
use std::collections::HashMap;

/// Default number of private channels kept
pub const PRIVATE_CHANNEL_CAPACITY: usize = 128;

struct Entry {
    channel: PrivateChannelRef,
    /// Counterpart of a direct message, mirrored in `by_user`
    recipient: Option<Snowflake>,
    last_access: u64,
}

pub struct PrivateChannelCache {
    capacity: usize,
    entries: HashMap<Snowflake, Entry>,
    by_user: HashMap<Snowflake, Snowflake>,
    clock: u64,
}

impl PrivateChannelCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            by_user: HashMap::new(),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up a channel, marking it most recently used
    pub fn get(&mut self, id: Snowflake) -> Option<PrivateChannelRef> {
        let now = self.tick();
        let entry = self.entries.get_mut(&id)?;
        entry.last_access = now;
        Some(entry.channel.clone())
    }

    /// Look up without touching recency
    pub fn peek(&self, id: Snowflake) -> Option<PrivateChannelRef> {
        self.entries.get(&id).map(|e| e.channel.clone())
    }

    /// Direct message channel with `user_id`
    pub fn get_by_user(&self, user_id: Snowflake) -> Option<PrivateChannelRef> {
        let channel_id = self.by_user.get(&user_id)?;
        self.peek(*channel_id)
    }

    /// Insert or overwrite; returns the channel evicted to make room
    pub fn insert(&mut self, channel: PrivateChannelRef) -> Option<PrivateChannelRef> {
        let (id, recipient) = {
            let guard = channel.read();
            (guard.id, guard.recipient_id())
        };

        let evicted = if self.entries.contains_key(&id) {
            self.remove(id);
            None
        } else if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        if let Some(user_id) = recipient {
            self.by_user.insert(user_id, id);
        }
        let now = self.tick();
        self.entries.insert(
            id,
            Entry {
                channel,
                recipient,
                last_access: now,
            },
        );
        evicted
    }

    pub fn remove(&mut self, id: Snowflake) -> Option<PrivateChannelRef> {
        let entry = self.entries.remove(&id)?;
        if let Some(user_id) = entry.recipient {
            // Only drop the mapping if it still points at this channel
            if self.by_user.get(&user_id) == Some(&id) {
                self.by_user.remove(&user_id);
            }
        }
        Some(entry.channel)
    }

    fn evict_oldest(&mut self) -> Option<PrivateChannelRef> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(id, _)| *id)?;
        tracing::trace!(channel_id = %oldest, "Evicting private channel");
        self.remove(oldest)
    }

    pub fn channels(&self) -> Vec<PrivateChannelRef> {
        self.entries.values().map(|e| e.channel.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_index_len(&self) -> usize {
        self.by_user.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_user.clear();
    }
}

impl Default for PrivateChannelCache {
    fn default() -> Self {
        Self::new(PRIVATE_CHANNEL_CAPACITY)
    }
}
