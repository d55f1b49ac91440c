//! Payload to entity mappers
//!
//! Conversions from decoded wire payloads to cached entities, and the merge
//! rules used when a payload names an entity that is already cached.

mod channel;
mod guild;
mod member;
mod message;
mod user;

pub use channel::{apply_private_channel_update, private_channel_from_payload};
pub use guild::{
    apply_guild_collections, apply_guild_metadata, build_guild, emoji_from_payload,
    guild_channel_from_payload,
};
pub use member::{apply_presence, member_from_payload, merge_member};
pub use message::{apply_message_update, message_from_payload};
pub use user::{apply_partial_user, apply_user, user_from_payload};
