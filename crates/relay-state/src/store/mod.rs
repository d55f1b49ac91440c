//! Entity store and its bounded collections

mod entity_store;
mod messages;
mod private_channels;
mod users;

pub use entity_store::{CachedChannel, EntityStore, UnavailableKind};
pub use messages::{MessageRing, DEFAULT_MESSAGE_CAPACITY};
pub use private_channels::{PrivateChannelCache, PRIVATE_CHANNEL_CAPACITY};
pub use users::UserTable;
