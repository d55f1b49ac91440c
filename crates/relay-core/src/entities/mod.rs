//! Cached entities - the local mirror of remote state

mod channel;
mod emoji;
mod guild;
mod member;
mod message;
mod presence;
mod relationship;
mod role;
mod user;
mod voice_state;

pub use channel::{ChannelType, GuildChannel, PrivateChannel, PrivateChannelKind, PrivateChannelRef};
pub use emoji::{Emoji, PartialEmoji};
pub use guild::{Guild, GuildRef};
pub use member::Member;
pub use message::{Message, Reaction};
pub use presence::{Activity, ClientStatus, Presence, Status};
pub use relationship::{Relationship, RelationshipType};
pub use role::Role;
pub use user::{User, UserRef};
pub use voice_state::VoiceState;
