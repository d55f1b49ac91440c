//! User payload -> entity mapper

use relay_core::User;

use crate::events::payloads::{PartialUserPayload, UserPayload};

/// Convert a full user payload to a User entity
impl From<&UserPayload> for User {
    fn from(payload: &UserPayload) -> Self {
        User {
            id: payload.id,
            name: payload.username.clone(),
            discriminator: payload.discriminator.clone(),
            avatar: payload.avatar.clone(),
            bot: payload.bot,
            system: payload.system,
        }
    }
}

pub fn user_from_payload(payload: &UserPayload) -> User {
    User::from(payload)
}

/// Merge a full payload into an existing user; true if anything changed
pub fn apply_user(user: &mut User, payload: &UserPayload) -> bool {
    let updated = User::from(payload);
    if *user == updated {
        return false;
    }
    *user = updated;
    true
}

/// Merge only the fields a partial payload carries
pub fn apply_partial_user(user: &mut User, payload: &PartialUserPayload) -> bool {
    let before = user.clone();
    if let Some(name) = &payload.username {
        user.name.clone_from(name);
    }
    if let Some(discriminator) = &payload.discriminator {
        user.discriminator.clone_from(discriminator);
    }
    if payload.username.is_some() || payload.avatar.is_some() {
        user.avatar.clone_from(&payload.avatar);
    }
    *user != before
}
