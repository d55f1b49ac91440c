//! User entity - a global account, shared by every guild it appears in

use parking_lot::RwLock;
use std::sync::Arc;

use crate::value_objects::Snowflake;

/// Shared handle to a cached user.
///
/// Every member, message author and private channel recipient holds one of
/// these; updates are applied through the lock so existing holders observe them.
pub type UserRef = Arc<RwLock<User>>;

/// User entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    pub discriminator: String,
    pub avatar: Option<String>,
    pub bot: bool,
    pub system: bool,
}

impl User {
    /// Discriminator used by webhook and system authors
    pub const PLACEHOLDER_DISCRIMINATOR: &'static str = "0000";

    /// Create a new User
    pub fn new(id: Snowflake, name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            discriminator: discriminator.into(),
            avatar: None,
            bot: false,
            system: false,
        }
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> UserRef {
        Arc::new(RwLock::new(self))
    }

    /// `name#discriminator`
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }

    /// Mention string
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Webhook/system users are not worth caching
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.discriminator == Self::PLACEHOLDER_DISCRIMINATOR
    }
}
