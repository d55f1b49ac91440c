//! Message payload -> entity mapper

use relay_core::Message;

use crate::events::payloads::{MessagePayload, MessageUpdatePayload};
use crate::store::EntityStore;

pub fn message_from_payload(store: &EntityStore, payload: &MessagePayload) -> Message {
    Message {
        id: payload.id,
        channel_id: payload.channel_id,
        guild_id: payload.guild_id,
        author: store.upsert_user(&payload.author),
        content: payload.content.clone(),
        timestamp: payload.timestamp,
        edited_timestamp: payload.edited_timestamp,
        pinned: payload.pinned,
        tts: payload.tts,
        mention_everyone: payload.mention_everyone,
        reactions: Vec::new(),
    }
}

/// Apply the fields an edit carries
pub fn apply_message_update(message: &mut Message, payload: &MessageUpdatePayload) {
    if let Some(content) = &payload.content {
        message.content.clone_from(content);
    }
    if payload.edited_timestamp.is_some() {
        message.edited_timestamp = payload.edited_timestamp;
    }
    if let Some(pinned) = payload.pinned {
        message.pinned = pinned;
    }
    if let Some(mention_everyone) = payload.mention_everyone {
        message.mention_everyone = mention_everyone;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embed_only_edit_keeps_content() {
        let store = EntityStore::new(10);
        let payload: MessagePayload = serde_json::from_value(json!({
            "id": "1", "channel_id": "2",
            "author": {"id": "3", "username": "a", "discriminator": "0001"},
            "content": "hello"
        }))
        .unwrap();
        let mut message = message_from_payload(&store, &payload);

        let edit: MessageUpdatePayload =
            serde_json::from_value(json!({"id": "1", "channel_id": "2", "pinned": true})).unwrap();
        apply_message_update(&mut message, &edit);

        assert_eq!(message.content, "hello");
        assert!(message.pinned);
        assert!(!message.is_edited());
    }
}
