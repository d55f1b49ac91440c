//! Message entity - a recently seen chat message

use chrono::{DateTime, Utc};

use super::emoji::PartialEmoji;
use super::user::UserRef;
use crate::value_objects::Snowflake;

/// Aggregated reaction on a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: PartialEmoji,
    pub count: u32,
    /// Whether the session user is among the reactors
    pub me: bool,
}

/// Message entity
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author: UserRef,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub tts: bool,
    pub mention_everyone: bool,
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Check if message has been edited
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    pub fn author_id(&self) -> Snowflake {
        self.author.read().id
    }

    /// Record a reaction, returning the updated aggregate
    pub fn add_reaction(&mut self, emoji: PartialEmoji, is_me: bool) -> Reaction {
        if let Some(reaction) = self.reactions.iter_mut().find(|r| r.emoji == emoji) {
            reaction.count += 1;
            reaction.me |= is_me;
            return reaction.clone();
        }

        let reaction = Reaction {
            emoji,
            count: 1,
            me: is_me,
        };
        self.reactions.push(reaction.clone());
        reaction
    }

    /// Remove one reaction; `None` if the emoji was never recorded
    pub fn remove_reaction(&mut self, emoji: &PartialEmoji, is_me: bool) -> Option<Reaction> {
        let pos = self.reactions.iter().position(|r| &r.emoji == emoji)?;
        let reaction = &mut self.reactions[pos];
        reaction.count = reaction.count.saturating_sub(1);
        if is_me {
            reaction.me = false;
        }

        let snapshot = reaction.clone();
        if snapshot.count == 0 {
            self.reactions.remove(pos);
        }
        Some(snapshot)
    }

    /// Drop every reaction, returning what was there
    pub fn clear_reactions(&mut self) -> Vec<Reaction> {
        std::mem::take(&mut self.reactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::User;

    fn message() -> Message {
        Message {
            id: Snowflake::new(1),
            channel_id: Snowflake::new(2),
            guild_id: None,
            author: User::new(Snowflake::new(3), "author", "0001").into_ref(),
            content: "hi".to_string(),
            timestamp: None,
            edited_timestamp: None,
            pinned: false,
            tts: false,
            mention_everyone: false,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn test_add_reaction_aggregates() {
        let mut msg = message();
        let fire = PartialEmoji::unicode("🔥");

        assert_eq!(msg.add_reaction(fire.clone(), false).count, 1);
        let reaction = msg.add_reaction(fire, true);
        assert_eq!(reaction.count, 2);
        assert!(reaction.me);
        assert_eq!(msg.reactions.len(), 1);
    }

    #[test]
    fn test_remove_reaction_drops_empty() {
        let mut msg = message();
        let fire = PartialEmoji::unicode("🔥");
        msg.add_reaction(fire.clone(), true);

        let removed = msg.remove_reaction(&fire, true).unwrap();
        assert_eq!(removed.count, 0);
        assert!(msg.reactions.is_empty());
        assert!(msg.remove_reaction(&fire, false).is_none());
    }

    #[test]
    fn test_clear_reactions() {
        let mut msg = message();
        msg.add_reaction(PartialEmoji::unicode("a"), false);
        msg.add_reaction(PartialEmoji::unicode("b"), false);

        assert_eq!(msg.clear_reactions().len(), 2);
        assert!(msg.reactions.is_empty());
    }
}
