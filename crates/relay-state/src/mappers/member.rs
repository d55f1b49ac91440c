//! Member payload -> entity mapper
//!
//! Merging is field-wise so a sparse payload never erases what an earlier,
//! richer one established. Applying the same payload twice is a no-op.

use relay_core::{Member, Snowflake, UserRef};

use crate::events::payloads::{MemberPayload, PresencePayload};

/// Build a member for `user` from a payload
pub fn member_from_payload(guild_id: Snowflake, user: UserRef, payload: &MemberPayload) -> Member {
    let mut member = Member::new(guild_id, user);
    merge_member(&mut member, payload);
    if let Some(presence) = &payload.presence {
        apply_presence(&mut member, presence);
    }
    member
}

/// Merge a member payload into an existing record.
///
/// A payload carrying `roles` is a full record: its optional fields replace
/// the cached ones, absent meaning cleared. Anything else only overwrites
/// the fields it names.
pub fn merge_member(member: &mut Member, payload: &MemberPayload) {
    if let Some(roles) = &payload.roles {
        member.role_ids.clone_from(roles);
        member.nick.clone_from(&payload.nick);
        member.avatar.clone_from(&payload.avatar);
        member.premium_since = payload.premium_since;
    } else {
        if payload.nick.is_some() {
            member.nick.clone_from(&payload.nick);
        }
        if payload.avatar.is_some() {
            member.avatar.clone_from(&payload.avatar);
        }
        if payload.premium_since.is_some() {
            member.premium_since = payload.premium_since;
        }
    }

    if payload.joined_at.is_some() {
        member.joined_at = payload.joined_at;
    }
    if let Some(deaf) = payload.deaf {
        member.deaf = deaf;
    }
    if let Some(mute) = payload.mute {
        member.mute = mute;
    }
    if let Some(pending) = payload.pending {
        member.pending = pending;
    }
}

/// Replace the volatile presence fields only
pub fn apply_presence(member: &mut Member, presence: &PresencePayload) {
    member.presence = presence.to_presence();
}
