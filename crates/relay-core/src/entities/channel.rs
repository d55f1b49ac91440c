//! Channel entities - guild channels and private (DM / group) channels

use parking_lot::RwLock;
use std::sync::Arc;

use super::user::UserRef;
use crate::value_objects::Snowflake;

/// Channel type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelType {
    #[default]
    Text,
    /// Direct message between two users
    Private,
    Voice,
    /// Group direct message
    Group,
    Category,
    News,
    Store,
    StageVoice,
    Unknown(i32),
}

impl ChannelType {
    /// Private channel types live outside guilds
    #[inline]
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private | Self::Group)
    }
}

impl From<i32> for ChannelType {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Text,
            1 => Self::Private,
            2 => Self::Voice,
            3 => Self::Group,
            4 => Self::Category,
            5 => Self::News,
            6 => Self::Store,
            13 => Self::StageVoice,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelType> for i32 {
    fn from(ct: ChannelType) -> Self {
        match ct {
            ChannelType::Text => 0,
            ChannelType::Private => 1,
            ChannelType::Voice => 2,
            ChannelType::Group => 3,
            ChannelType::Category => 4,
            ChannelType::News => 5,
            ChannelType::Store => 6,
            ChannelType::StageVoice => 13,
            ChannelType::Unknown(other) => other,
        }
    }
}

/// Channel owned by a guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildChannel {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub kind: ChannelType,
    pub name: String,
    pub position: i32,
    pub topic: Option<String>,
    pub parent_id: Option<Snowflake>,
    pub nsfw: bool,
    pub last_message_id: Option<Snowflake>,
}

impl GuildChannel {
    /// Text-like channels track their last message
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ChannelType::Text | ChannelType::News)
    }
}

/// Shared handle to a cached private channel
pub type PrivateChannelRef = Arc<RwLock<PrivateChannel>>;

/// DM or group channel, cached outside any guild
#[derive(Debug, Clone)]
pub struct PrivateChannel {
    pub id: Snowflake,
    pub kind: PrivateChannelKind,
    pub last_message_id: Option<Snowflake>,
}

#[derive(Debug, Clone)]
pub enum PrivateChannelKind {
    Direct {
        recipient: UserRef,
    },
    Group {
        recipients: Vec<UserRef>,
        name: Option<String>,
        icon: Option<String>,
        owner_id: Option<Snowflake>,
    },
}

impl PrivateChannel {
    /// Create a direct message channel with a single counterpart
    pub fn direct(id: Snowflake, recipient: UserRef) -> Self {
        Self {
            id,
            kind: PrivateChannelKind::Direct { recipient },
            last_message_id: None,
        }
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> PrivateChannelRef {
        Arc::new(RwLock::new(self))
    }

    pub fn channel_type(&self) -> ChannelType {
        match self.kind {
            PrivateChannelKind::Direct { .. } => ChannelType::Private,
            PrivateChannelKind::Group { .. } => ChannelType::Group,
        }
    }

    /// Counterpart of a direct message channel
    pub fn recipient_id(&self) -> Option<Snowflake> {
        match &self.kind {
            PrivateChannelKind::Direct { recipient } => Some(recipient.read().id),
            PrivateChannelKind::Group { .. } => None,
        }
    }

    /// All recipients, excluding the session user
    pub fn recipients(&self) -> Vec<UserRef> {
        match &self.kind {
            PrivateChannelKind::Direct { recipient } => vec![Arc::clone(recipient)],
            PrivateChannelKind::Group { recipients, .. } => recipients.clone(),
        }
    }
}
