//! READY, READY_SUPPLEMENTAL, RESUMED and USER_UPDATE

use relay_core::{DomainError, Snowflake};
use std::collections::HashMap;
use std::sync::Arc;

use super::relationship::relationship_from_payload;
use crate::dispatch::EventDispatcher;
use crate::error::{StateError, StateResult};
use crate::events::payloads::{MemberPayload, ReadyPayload, ReadySupplementalPayload, UserPayload};
use crate::events::ClientEvent;
use crate::mappers;
use crate::store::UnavailableKind;

impl EventDispatcher {
    /// Stash the first half of the baseline until its supplement arrives
    pub(crate) fn on_ready(&self, payload: ReadyPayload) -> StateResult<()> {
        tracing::info!(
            session_id = ?payload.session_id,
            guilds = payload.guilds.len(),
            "Received baseline snapshot"
        );
        self.sequencer.begin_baseline();
        *self.pending_ready.lock() = Some(payload);
        Ok(())
    }

    /// Rebuild the store from the merged baseline and start hydration
    pub(crate) fn on_ready_supplemental(&self, extra: ReadySupplementalPayload) -> StateResult<()> {
        let Some(mut ready) = self.pending_ready.lock().take() else {
            return Err(DomainError::MalformedPayload(
                "READY_SUPPLEMENTAL without a preceding READY".to_string(),
            )
            .into());
        };

        self.sequencer.cancel();
        self.ctx.chunks.clear();
        let store = &self.ctx.store;
        store.clear();

        let merged = merge_supplemental(&mut ready, extra);
        if merged < ready.guilds.len() {
            tracing::debug!(
                merged,
                guilds = ready.guilds.len(),
                "Supplemental lists shorter than guild list"
            );
        }

        store.set_me(mappers::user_from_payload(&ready.user).into_ref());

        let mut known_users: HashMap<Snowflake, UserPayload> =
            ready.users.drain(..).map(|u| (u.id, u)).collect();
        known_users.insert(ready.user.id, ready.user.clone());

        let flags = self.ctx.cache_flags();
        for mut guild in ready.guilds {
            resolve_member_users(&mut guild.members, &known_users);

            if guild.unavailable {
                store.mark_unavailable(guild.id, UnavailableKind::Existing);
                tracing::debug!(guild_id = %guild.id, "Requesting unavailable guild");
                self.spawn_guild_request(guild.id);
            } else {
                store.add_guild(mappers::build_guild(store, &guild, flags).into_ref());
            }
        }

        for payload in &ready.relationships {
            let user = payload
                .user
                .as_ref()
                .or_else(|| payload.user_id.and_then(|id| known_users.get(&id)));
            let Some(user) = user else {
                tracing::debug!(relationship_id = %payload.id, "Skipping relationship with unknown user");
                continue;
            };
            let relationship = relationship_from_payload(store, payload, user);
            store.add_relationship(user.id, relationship);
        }

        for mut payload in ready.private_channels {
            if payload.recipients.is_none() {
                payload.recipients = payload.recipient_ids.as_ref().map(|ids| {
                    ids.iter()
                        .filter_map(|id| known_users.get(id).cloned())
                        .collect()
                });
            }
            match mappers::private_channel_from_payload(store, &payload) {
                Some(channel) => {
                    store.add_private_channel(channel.into_ref());
                }
                None => {
                    tracing::debug!(channel_id = %payload.id, "Skipping unusable private channel");
                }
            }
        }

        tracing::info!(
            guilds = store.guild_count(),
            private_channels = store.private_channel_count(),
            relationships = store.relationships().len(),
            "Baseline applied"
        );

        self.ctx.events.emit(ClientEvent::Connect);
        self.sequencer
            .start_hydration(Arc::clone(&self.ctx), store.guild_ids());
        Ok(())
    }

    pub(crate) fn on_resumed(&self) -> StateResult<()> {
        tracing::info!("Session resumed");
        self.ctx.events.emit(ClientEvent::Resumed);
        Ok(())
    }

    pub(crate) fn on_user_update(&self, payload: &UserPayload) -> StateResult<()> {
        let me = self.ctx.store.me().ok_or(StateError::NotConnected)?;
        let change = {
            let mut user = me.write();
            let before = user.clone();
            mappers::apply_user(&mut user, payload).then(|| (before, user.clone()))
        };

        if let Some((before, after)) = change {
            self.ctx.events.emit(ClientEvent::UserUpdate { before, after });
        }
        Ok(())
    }
}

/// Zip the supplemental lists onto the baseline's guilds by position.
///
/// The five lists are merged up to the shortest one; guilds past that point
/// keep only what the baseline itself carried. Returns the number of guilds
/// merged.
fn merge_supplemental(ready: &mut ReadyPayload, extra: ReadySupplementalPayload) -> usize {
    let lists = ready
        .guilds
        .iter_mut()
        .zip(extra.guilds)
        .zip(extra.merged_members)
        .zip(std::mem::take(&mut ready.merged_members))
        .zip(extra.merged_presences.guilds);

    let mut merged = 0;
    for ((((guild, guild_extra), theirs), mine), presences) in lists {
        guild.voice_states = guild_extra.voice_states;
        guild.members = mine;
        guild.members.extend(theirs);
        guild.presences = presences;
        merged += 1;
    }
    merged
}

/// Fill in members that reference their user only by id
fn resolve_member_users(members: &mut [MemberPayload], users: &HashMap<Snowflake, UserPayload>) {
    for member in members.iter_mut().filter(|m| m.user.is_none()) {
        member.user = member.user_id.and_then(|id| users.get(&id).cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::test_support::{Harness, ME};
    use crate::ready::SessionPhase;
    use serde_json::json;

    fn ready(guilds: usize, members: usize) -> ReadyPayload {
        serde_json::from_value(json!({
            "user": {"id": ME.to_string(), "username": "me", "discriminator": "0001"},
            "guilds": (1..=guilds).map(|i| json!({"id": i.to_string(), "name": format!("g{i}")})).collect::<Vec<_>>(),
            "merged_members": (0..members).map(|_| json!([{"user_id": ME.to_string(), "roles": []}])).collect::<Vec<_>>()
        }))
        .unwrap()
    }

    fn supplemental(guilds: usize) -> ReadySupplementalPayload {
        serde_json::from_value(json!({
            "guilds": (1..=guilds).map(|i| json!({"id": i.to_string(), "voice_states": [
                {"user_id": "7", "channel_id": "70", "session_id": "s"}
            ]})).collect::<Vec<_>>(),
            "merged_members": (0..guilds).map(|_| json!([{"user_id": "7", "roles": []}])).collect::<Vec<_>>(),
            "merged_presences": {"guilds": (0..guilds).map(|_| json!([])).collect::<Vec<_>>()}
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_zips_all_lists() {
        let mut ready = ready(2, 2);
        assert_eq!(merge_supplemental(&mut ready, supplemental(2)), 2);

        for guild in &ready.guilds {
            assert_eq!(guild.voice_states.len(), 1);
            assert_eq!(guild.members.len(), 2);
            assert_eq!(guild.members[0].user_id, Some(Snowflake::new(ME)));
        }
    }

    #[test]
    fn test_merge_truncates_to_shortest_list() {
        // Three guilds, but the member lists only cover two
        let mut ready = ready(3, 2);
        assert_eq!(merge_supplemental(&mut ready, supplemental(3)), 2);

        assert_eq!(ready.guilds[1].members.len(), 2);
        assert!(ready.guilds[2].members.is_empty());
        assert!(ready.guilds[2].voice_states.is_empty());
    }

    #[test]
    fn test_resolve_member_users_from_baseline() {
        let mut members: Vec<MemberPayload> =
            serde_json::from_value(json!([{"user_id": "7"}, {"user_id": "8"}])).unwrap();
        let users = HashMap::from([(
            Snowflake::new(7),
            serde_json::from_value::<UserPayload>(json!({"id": "7", "username": "seven"})).unwrap(),
        )]);

        resolve_member_users(&mut members, &users);
        assert_eq!(members[0].user.as_ref().unwrap().username, "seven");
        assert!(members[1].user.is_none());
    }

    #[tokio::test]
    async fn test_supplemental_without_ready_is_rejected() {
        let harness = Harness::new();
        let result = harness.send("READY_SUPPLEMENTAL", json!({}));
        assert!(matches!(
            result,
            Err(StateError::Domain(DomainError::MalformedPayload(_)))
        ));
    }

    #[tokio::test]
    async fn test_baseline_materializes_store() {
        let mut harness = Harness::new();
        harness
            .send(
                "READY",
                json!({
                    "user": {"id": "100", "username": "me", "discriminator": "0001"},
                    "users": [{"id": "7", "username": "friend", "discriminator": "0007"}],
                    "guilds": [
                        {"id": "1", "name": "one", "owner_id": "100"},
                        {"id": "2", "unavailable": true}
                    ],
                    "merged_members": [[{"user_id": "100", "roles": [], "joined_at": "2020-01-01T00:00:00+00:00"}], []],
                    "relationships": [{"id": "7", "type": 1, "user_id": "7"}],
                    "private_channels": [{"id": "50", "type": 1, "recipient_ids": ["7"]}]
                }),
            )
            .unwrap();
        assert_eq!(harness.dispatcher.sequencer.phase(), SessionPhase::AwaitingBaseline);

        harness
            .send(
                "READY_SUPPLEMENTAL",
                json!({
                    "guilds": [{"id": "1"}, {"id": "2"}],
                    "merged_members": [[], []],
                    "merged_presences": {"guilds": [[], []]}
                }),
            )
            .unwrap();

        let store = &harness.ctx.store;
        assert_eq!(store.guild_count(), 1);
        assert_eq!(
            store.unavailable_kind(Snowflake::new(2)),
            Some(UnavailableKind::Existing)
        );
        let guild = store.get_guild(Snowflake::new(1)).unwrap();
        assert!(guild.read().get_member(Snowflake::new(ME)).is_some());
        assert!(store.get_relationship(Snowflake::new(7)).is_some());
        assert!(store.get_dm_channel(Snowflake::new(7)).is_some());
        assert_eq!(harness.names().first(), Some(&"connect"));
    }

    #[tokio::test]
    async fn test_user_update_emits_on_change_only() {
        let mut harness = Harness::new();
        let payload = json!({"id": "100", "username": "renamed", "discriminator": "0001"});

        harness.send("USER_UPDATE", payload.clone()).unwrap();
        harness.send("USER_UPDATE", payload).unwrap();

        let events = harness.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ClientEvent::UserUpdate { before, after } => {
                assert_eq!(before.name, "me");
                assert_eq!(after.name, "renamed");
            }
            other => panic!("unexpected event {}", other.name()),
        }
        assert_eq!(harness.ctx.store.me().unwrap().read().name, "renamed");
    }
}
