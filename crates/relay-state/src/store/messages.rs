//! Recent message ring
//!
//! Best-effort recency cache used to correlate edits and deletes with
//! messages seen by this process. Never authoritative.

use relay_core::{Message, Snowflake};
use std::collections::VecDeque;

/// Capacity used when the configured value is not positive
pub const DEFAULT_MESSAGE_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct MessageRing {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_MESSAGE_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity.min(DEFAULT_MESSAGE_CAPACITY)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a message, dropping the oldest when full.
    ///
    /// A message already in the ring is replaced where it stands.
    pub fn record(&mut self, message: Message) {
        if let Some(existing) = self.find_mut(|m| m.id == message.id) {
            *existing = message;
            return;
        }
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Most recent message matching `predicate`
    pub fn find<P>(&self, mut predicate: P) -> Option<&Message>
    where
        P: FnMut(&Message) -> bool,
    {
        self.messages.iter().rev().find(|m| predicate(m))
    }

    pub fn find_mut<P>(&mut self, mut predicate: P) -> Option<&mut Message>
    where
        P: FnMut(&Message) -> bool,
    {
        self.messages.iter_mut().rev().find(|m| predicate(m))
    }

    pub fn get(&self, id: Snowflake) -> Option<&Message> {
        self.find(|m| m.id == id)
    }

    pub fn remove(&mut self, id: Snowflake) -> Option<Message> {
        let pos = self.messages.iter().rposition(|m| m.id == id)?;
        self.messages.remove(pos)
    }

    /// Remove every listed message that is cached, in ring order
    pub fn remove_many(&mut self, ids: &[Snowflake]) -> Vec<Message> {
        let mut removed = Vec::new();
        self.messages.retain(|m| {
            if ids.contains(&m.id) {
                removed.push(m.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Drop every message belonging to a guild
    pub fn purge_guild(&mut self, guild_id: Snowflake) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| m.guild_id != Some(guild_id));
        before - self.messages.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for MessageRing {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_CAPACITY)
    }
}
