//! Private channel payload -> entity mapper

use relay_core::{ChannelType, PrivateChannel, PrivateChannelKind};

use crate::events::payloads::ChannelPayload;
use crate::store::EntityStore;

/// Build a DM or group channel, resolving recipients through the store.
///
/// Returns `None` for guild channel types and for a DM without a recipient.
pub fn private_channel_from_payload(
    store: &EntityStore,
    payload: &ChannelPayload,
) -> Option<PrivateChannel> {
    let recipients: Vec<_> = payload
        .recipients
        .iter()
        .flatten()
        .map(|user| store.upsert_user(user))
        .collect();

    let kind = match payload.channel_type() {
        ChannelType::Private => PrivateChannelKind::Direct {
            recipient: recipients.into_iter().next()?,
        },
        ChannelType::Group => PrivateChannelKind::Group {
            recipients,
            name: payload.name.clone(),
            icon: payload.icon.clone(),
            owner_id: payload.owner_id,
        },
        _ => return None,
    };

    Some(PrivateChannel {
        id: payload.id,
        kind,
        last_message_id: payload.last_message_id,
    })
}

/// Apply a CHANNEL_UPDATE to a cached private channel
pub fn apply_private_channel_update(
    store: &EntityStore,
    channel: &mut PrivateChannel,
    payload: &ChannelPayload,
) {
    if payload.last_message_id.is_some() {
        channel.last_message_id = payload.last_message_id;
    }
    if let PrivateChannelKind::Group {
        recipients,
        name,
        icon,
        owner_id,
    } = &mut channel.kind
    {
        name.clone_from(&payload.name);
        icon.clone_from(&payload.icon);
        if payload.owner_id.is_some() {
            *owner_id = payload.owner_id;
        }
        if let Some(users) = &payload.recipients {
            *recipients = users.iter().map(|u| store.upsert_user(u)).collect();
        }
    }
}
