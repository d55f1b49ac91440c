//! # relay-core
//!
//! Domain layer containing the identifier type, permissions, and the cached
//! entities mirrored from the remote service.
//! This crate has no knowledge of the wire protocol or of async runtimes.

pub mod entities;
pub mod error;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, ChannelType, ClientStatus, Emoji, Guild, GuildChannel, GuildRef, Member, Message,
    PartialEmoji, Presence, PrivateChannel, PrivateChannelKind, PrivateChannelRef, Reaction,
    Relationship, RelationshipType, Role, Status, User, UserRef, VoiceState,
};
pub use error::DomainError;
pub use value_objects::{Permissions, Snowflake, SnowflakeParseError};
