//! CHANNEL_* and CHANNEL_RECIPIENT_* handlers

use relay_core::{DomainError, PrivateChannelKind};
use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::payloads::{ChannelPayload, ChannelRecipientPayload};
use crate::events::ClientEvent;
use crate::mappers;

impl EventDispatcher {
    pub(crate) fn on_channel_create(&self, payload: &ChannelPayload) -> StateResult<()> {
        let store = &self.ctx.store;

        if payload.channel_type().is_private() {
            if store.get_private_channel(payload.id).is_some() {
                tracing::trace!(channel_id = %payload.id, "Private channel already cached");
                return Ok(());
            }
            let channel = mappers::private_channel_from_payload(store, payload)
                .ok_or(DomainError::MissingField("recipients"))?
                .into_ref();
            store.add_private_channel(Arc::clone(&channel));
            self.ctx.events.emit(ClientEvent::PrivateChannelCreate(channel));
            return Ok(());
        }

        let guild_id = payload.guild_id.ok_or(DomainError::MissingField("guild_id"))?;
        let guild = self.require_guild(guild_id)?;
        let channel = mappers::guild_channel_from_payload(guild_id, payload);
        guild.write().add_channel(channel.clone());

        self.ctx.events.emit(ClientEvent::GuildChannelCreate(channel));
        Ok(())
    }

    pub(crate) fn on_channel_update(&self, payload: &ChannelPayload) -> StateResult<()> {
        let store = &self.ctx.store;

        if payload.channel_type().is_private() {
            let channel = store
                .get_private_channel(payload.id)
                .ok_or(DomainError::UnknownChannel(payload.id))?;
            mappers::apply_private_channel_update(store, &mut channel.write(), payload);
            self.ctx.events.emit(ClientEvent::PrivateChannelUpdate(channel));
            return Ok(());
        }

        let guild_id = payload.guild_id.ok_or(DomainError::MissingField("guild_id"))?;
        let guild = self.require_guild(guild_id)?;
        let (before, after) = {
            let mut g = guild.write();
            let before = g
                .get_channel(payload.id)
                .cloned()
                .ok_or(DomainError::UnknownChannel(payload.id))?;
            let mut after = mappers::guild_channel_from_payload(guild_id, payload);
            after.last_message_id = after.last_message_id.or(before.last_message_id);
            g.add_channel(after.clone());
            (before, after)
        };

        self.ctx
            .events
            .emit(ClientEvent::GuildChannelUpdate { before, after });
        Ok(())
    }

    pub(crate) fn on_channel_delete(&self, payload: &ChannelPayload) -> StateResult<()> {
        match payload.guild_id {
            Some(guild_id) => {
                let guild = self.require_guild(guild_id)?;
                let removed = guild.write().remove_channel(payload.id);
                let channel = removed.ok_or(DomainError::UnknownChannel(payload.id))?;
                self.ctx.events.emit(ClientEvent::GuildChannelDelete(channel));
            }
            None => {
                let channel = self
                    .ctx
                    .store
                    .remove_private_channel(payload.id)
                    .ok_or(DomainError::UnknownChannel(payload.id))?;
                self.ctx.events.emit(ClientEvent::PrivateChannelDelete(channel));
            }
        }
        Ok(())
    }

    pub(crate) fn on_channel_recipient_add(&self, payload: &ChannelRecipientPayload) -> StateResult<()> {
        let store = &self.ctx.store;
        let channel = store
            .get_private_channel(payload.channel_id)
            .ok_or(DomainError::UnknownChannel(payload.channel_id))?;
        let user = store.upsert_user(&payload.user);

        {
            let mut c = channel.write();
            let PrivateChannelKind::Group { recipients, .. } = &mut c.kind else {
                return Err(DomainError::MalformedPayload(format!(
                    "recipient added to direct channel {}",
                    payload.channel_id
                ))
                .into());
            };
            if !recipients.iter().any(|r| r.read().id == payload.user.id) {
                recipients.push(Arc::clone(&user));
            }
        }

        self.ctx.events.emit(ClientEvent::GroupJoin { channel, user });
        Ok(())
    }

    pub(crate) fn on_channel_recipient_remove(
        &self,
        payload: &ChannelRecipientPayload,
    ) -> StateResult<()> {
        let channel = self
            .ctx
            .store
            .get_private_channel(payload.channel_id)
            .ok_or(DomainError::UnknownChannel(payload.channel_id))?;

        let removed = {
            let mut c = channel.write();
            let removed = match &mut c.kind {
                PrivateChannelKind::Group { recipients, .. } => recipients
                    .iter()
                    .position(|r| r.read().id == payload.user.id)
                    .map(|index| recipients.remove(index)),
                PrivateChannelKind::Direct { .. } => None,
            };
            removed
        };

        match removed {
            Some(user) => self.ctx.events.emit(ClientEvent::GroupRemove { channel, user }),
            None => {
                tracing::debug!(
                    channel_id = %payload.channel_id,
                    user_id = %payload.user.id,
                    "Removing unknown group recipient"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::test_support::Harness;
    use crate::error::StateError;
    use relay_core::Snowflake;
    use serde_json::json;

    fn group() -> serde_json::Value {
        json!({
            "id": "60", "type": 3, "name": "trip",
            "recipients": [{"id": "7", "username": "seven", "discriminator": "0007"}]
        })
    }

    fn recipient(id: &str) -> serde_json::Value {
        json!({"channel_id": "60", "user": {"id": id, "username": format!("user{id}"), "discriminator": "0001"}})
    }

    #[test]
    fn test_guild_channel_lifecycle() {
        let mut harness = Harness::new().with_guild();
        let channel = json!({"id": "10", "type": 0, "guild_id": "1", "name": "general", "last_message_id": "500"});

        harness.send("CHANNEL_CREATE", channel).unwrap();
        harness
            .send(
                "CHANNEL_UPDATE",
                json!({"id": "10", "type": 0, "guild_id": "1", "name": "chat"}),
            )
            .unwrap();
        {
            let guild = harness.guild();
            let guild = guild.read();
            let cached = guild.get_channel(Snowflake::new(10)).unwrap();
            assert_eq!(cached.name, "chat");
            assert_eq!(cached.last_message_id, Some(Snowflake::new(500)));
        }

        harness
            .send("CHANNEL_DELETE", json!({"id": "10", "type": 0, "guild_id": "1"}))
            .unwrap();
        assert!(harness.guild().read().get_channel(Snowflake::new(10)).is_none());
        assert_eq!(
            harness.names(),
            vec!["guild_channel_create", "guild_channel_update", "guild_channel_delete"]
        );
    }

    #[test]
    fn test_guild_channel_requires_known_guild() {
        let harness = Harness::new();
        let err = harness
            .send("CHANNEL_CREATE", json!({"id": "10", "type": 0, "guild_id": "9"}))
            .unwrap_err();
        assert!(matches!(err, StateError::Domain(DomainError::UnknownGuild(_))));

        let err = harness
            .send("CHANNEL_CREATE", json!({"id": "10", "type": 0}))
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::Domain(DomainError::MissingField("guild_id"))
        ));
    }

    #[test]
    fn test_private_channel_create_is_idempotent() {
        let mut harness = Harness::new();
        let dm = json!({"id": "50", "type": 1, "recipients": [{"id": "7", "username": "seven", "discriminator": "0007"}]});

        harness.send("CHANNEL_CREATE", dm.clone()).unwrap();
        harness.send("CHANNEL_CREATE", dm).unwrap();

        assert_eq!(harness.names(), vec!["private_channel_create"]);
        assert!(harness.ctx.store.get_dm_channel(Snowflake::new(7)).is_some());
    }

    #[test]
    fn test_private_channel_delete() {
        let mut harness = Harness::new();
        harness.send("CHANNEL_CREATE", group()).unwrap();
        harness
            .send("CHANNEL_DELETE", json!({"id": "60", "type": 3}))
            .unwrap();

        assert!(harness.ctx.store.get_private_channel(Snowflake::new(60)).is_none());
        assert_eq!(
            harness.names(),
            vec!["private_channel_create", "private_channel_delete"]
        );
    }

    #[test]
    fn test_group_recipients() {
        let mut harness = Harness::new();
        harness.send("CHANNEL_CREATE", group()).unwrap();

        harness.send("CHANNEL_RECIPIENT_ADD", recipient("8")).unwrap();
        // Same user twice is not duplicated
        harness.send("CHANNEL_RECIPIENT_ADD", recipient("8")).unwrap();
        {
            let channel = harness.ctx.store.get_private_channel(Snowflake::new(60)).unwrap();
            assert_eq!(channel.read().recipients().len(), 2);
        }

        harness.send("CHANNEL_RECIPIENT_REMOVE", recipient("7")).unwrap();
        harness.send("CHANNEL_RECIPIENT_REMOVE", recipient("9")).unwrap();

        let channel = harness.ctx.store.get_private_channel(Snowflake::new(60)).unwrap();
        assert_eq!(channel.read().recipients().len(), 1);
        assert_eq!(
            harness.names(),
            vec!["private_channel_create", "group_join", "group_join", "group_remove"]
        );
    }

    #[test]
    fn test_group_update_renames() {
        let mut harness = Harness::new();
        harness.send("CHANNEL_CREATE", group()).unwrap();
        harness
            .send("CHANNEL_UPDATE", json!({"id": "60", "type": 3, "name": "holiday"}))
            .unwrap();

        let channel = harness.ctx.store.get_private_channel(Snowflake::new(60)).unwrap();
        match &channel.read().kind {
            PrivateChannelKind::Group { name, .. } => assert_eq!(name.as_deref(), Some("holiday")),
            PrivateChannelKind::Direct { .. } => panic!("expected group"),
        }
        assert_eq!(
            harness.names(),
            vec!["private_channel_create", "private_channel_update"]
        );
    }
}
