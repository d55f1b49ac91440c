//! Member add/update/remove, chunk replies and member list diffs

use relay_common::MemberCacheFlags;
use relay_core::{DomainError, GuildRef, Member, Snowflake};
use serde_json::Value;
use std::collections::HashMap;

use crate::dispatch::dispatcher::decode;
use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::payloads::{
    GuildMemberRemovePayload, MemberListOp, MemberListUpdatePayload, MemberPayload,
    MembersChunkPayload,
};
use crate::events::ClientEvent;
use crate::mappers;

impl EventDispatcher {
    pub(crate) fn on_guild_member_add(&self, payload: &MemberPayload) -> StateResult<()> {
        let guild_id = payload.guild_id.ok_or(DomainError::MissingField("guild_id"))?;
        let user_payload = payload.user.as_ref().ok_or(DomainError::MissingField("user"))?;
        let guild = self.require_guild(guild_id)?;

        let user = self.ctx.store.upsert_user(user_payload);
        let member = mappers::member_from_payload(guild_id, user, payload);
        {
            let mut guild = guild.write();
            // A cached member means this join was already counted. Without
            // JOINED caching a redelivered join cannot be told apart.
            let known = guild.get_member(member.user_id).is_some();
            if self.ctx.cache_flags().contains(MemberCacheFlags::JOINED) {
                guild.add_member(member.clone());
            }
            if !known {
                if let Some(count) = guild.member_count.as_mut() {
                    *count += 1;
                }
            }
        }

        self.ctx.events.emit(ClientEvent::MemberJoin(member));
        Ok(())
    }

    pub(crate) fn on_guild_member_remove(&self, payload: &GuildMemberRemovePayload) -> StateResult<()> {
        let guild_id = payload.guild_id;
        let user_id = payload.user.id;
        let guild = self.require_guild(guild_id)?;

        let removed = {
            let mut guild = guild.write();
            if let Some(count) = guild.member_count.as_mut() {
                *count = count.saturating_sub(1);
            }
            guild.remove_member(user_id)
        };

        let member = removed.ok_or(DomainError::UnknownMember { guild_id, user_id })?;
        self.ctx.events.emit(ClientEvent::MemberRemove(member));
        Ok(())
    }

    pub(crate) fn on_guild_member_update(&self, payload: &MemberPayload) -> StateResult<()> {
        let guild_id = payload.guild_id.ok_or(DomainError::MissingField("guild_id"))?;
        let user_payload = payload.user.as_ref().ok_or(DomainError::MissingField("user"))?;
        let guild = self.require_guild(guild_id)?;

        let (user, user_change) = self.ctx.store.upsert_user_tracked(user_payload);
        let member_change = {
            let mut guild = guild.write();
            match guild.get_member_mut(user_payload.id) {
                Some(member) => {
                    let before = member.clone();
                    mappers::merge_member(member, payload);
                    Some((before, member.clone()))
                }
                None => {
                    if self.ctx.cache_flags().contains(MemberCacheFlags::JOINED) {
                        guild.add_member(mappers::member_from_payload(guild_id, user, payload));
                    }
                    tracing::debug!(
                        guild_id = %guild_id,
                        user_id = %user_payload.id,
                        "Member update for uncached member"
                    );
                    None
                }
            }
        };

        if let Some((before, after)) = user_change {
            self.ctx.events.emit(ClientEvent::UserUpdate { before, after });
        }
        if let Some((before, after)) = member_change {
            self.ctx.events.emit(ClientEvent::MemberUpdate { before, after });
        }
        Ok(())
    }

    /// Reply batch to a member request. The guild need not be cached; the
    /// batch still completes its request.
    pub(crate) fn on_guild_members_chunk(&self, payload: MembersChunkPayload) -> StateResult<()> {
        let store = &self.ctx.store;
        let guild_id = payload.guild_id;

        let mut members: Vec<Member> = payload
            .members
            .iter()
            .filter_map(|m| {
                let user = store.upsert_user(m.user.as_ref()?);
                Some(mappers::member_from_payload(guild_id, user, m))
            })
            .collect();

        if !payload.presences.is_empty() {
            let index: HashMap<Snowflake, usize> = members
                .iter()
                .enumerate()
                .map(|(i, m)| (m.user_id, i))
                .collect();
            for presence in &payload.presences {
                let Some(&i) = presence.user_id().and_then(|id| index.get(&id)) else {
                    continue;
                };
                mappers::apply_presence(&mut members[i], presence);
            }
        }

        tracing::debug!(
            guild_id = %guild_id,
            count = members.len(),
            chunk_index = payload.chunk_index,
            chunk_count = ?payload.chunk_count,
            "Processed member chunk"
        );

        let Some(nonce) = payload.nonce.as_deref() else {
            return Ok(());
        };
        if let Some(result) = self
            .ctx
            .chunks
            .on_batch(guild_id, nonce, members, payload.is_final())
        {
            self.ctx.events.emit(ClientEvent::ChunkRequestResult(result));
        }
        Ok(())
    }

    /// Apply a member list operation log.
    ///
    /// SYNC refreshes silently; INSERT and UPDATE report what changed.
    /// DELETE and INVALIDATE address rows by index and are skipped.
    pub(crate) fn on_guild_member_list_update(&self, data: Value) -> StateResult<()> {
        self.ctx
            .events
            .emit(ClientEvent::RawMemberListUpdate(data.clone()));

        let payload: MemberListUpdatePayload = decode(data)?;
        let guild = self.require_guild(payload.guild_id)?;
        {
            let mut guild = guild.write();
            if payload.member_count > 0 {
                guild.member_count = Some(payload.member_count);
            }
            guild.online_count = Some(payload.online_count());
        }

        let mut events = Vec::new();
        for op in &payload.ops {
            match op {
                MemberListOp::Sync { items } => {
                    for member in items.iter().filter_map(|item| item.member.as_ref()) {
                        self.apply_list_member(&guild, member);
                    }
                }
                MemberListOp::Insert { item } | MemberListOp::Update { item } => {
                    if let Some(member) = &item.member {
                        events.extend(self.apply_list_member(&guild, member));
                    }
                }
                MemberListOp::Other => {}
            }
        }

        for event in events {
            self.ctx.events.emit(event);
        }
        Ok(())
    }

    /// Merge one member list entry, materializing it if unknown; returns the
    /// events describing changes to an already cached member
    fn apply_list_member(&self, guild: &GuildRef, payload: &MemberPayload) -> Vec<ClientEvent> {
        let Some(user_payload) = &payload.user else {
            return Vec::new();
        };
        let (user, user_change) = self.ctx.store.upsert_user_tracked(user_payload);
        let keep_new = self.caches_listed_member(user_payload.id, payload);

        let mut events = Vec::new();
        if let Some((before, after)) = user_change {
            events.push(ClientEvent::UserUpdate { before, after });
        }

        let mut guild = guild.write();
        let guild_id = guild.id;
        if let Some(member) = guild.get_member_mut(user_payload.id) {
            let before = member.clone();
            mappers::merge_member(member, payload);
            if let Some(presence) = &payload.presence {
                mappers::apply_presence(member, presence);
            }
            if *member != before {
                events.push(ClientEvent::MemberUpdate {
                    before,
                    after: member.clone(),
                });
            }
        } else if keep_new {
            guild.add_member(mappers::member_from_payload(guild_id, user, payload));
        }
        events
    }

    fn caches_listed_member(&self, user_id: Snowflake, payload: &MemberPayload) -> bool {
        let flags = self.ctx.cache_flags();
        let online = payload
            .presence
            .as_ref()
            .is_some_and(|p| !p.status.is_offline());

        flags.contains(MemberCacheFlags::JOINED)
            || (flags.contains(MemberCacheFlags::ONLINE) && online)
            || self.ctx.store.is_me(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::test_support::{Harness, GUILD};
    use crate::error::StateError;
    use relay_core::Status;
    use serde_json::json;

    fn user(id: &str) -> Value {
        json!({"id": id, "username": format!("user{id}"), "discriminator": "0001"})
    }

    #[test]
    fn test_member_add_counts_and_caches() {
        let mut harness = Harness::new().with_guild();
        harness.guild().write().member_count = Some(10);

        harness
            .send(
                "GUILD_MEMBER_ADD",
                json!({"guild_id": "1", "user": user("7"), "roles": [], "joined_at": "2021-01-01T00:00:00+00:00"}),
            )
            .unwrap();

        let guild = harness.guild();
        assert_eq!(guild.read().member_count, Some(11));
        assert!(guild.read().get_member(Snowflake::new(7)).is_some());
        assert_eq!(harness.names(), vec!["member_join"]);
    }

    #[test]
    fn test_member_add_redelivery_counts_once() {
        let mut harness = Harness::new().with_guild();
        harness.guild().write().member_count = Some(10);
        let payload = json!({"guild_id": "1", "user": user("7"), "roles": [], "joined_at": "2021-01-01T00:00:00+00:00"});

        harness.send("GUILD_MEMBER_ADD", payload.clone()).unwrap();
        harness.send("GUILD_MEMBER_ADD", payload).unwrap();

        let guild = harness.guild();
        assert_eq!(guild.read().member_count, Some(11));
        assert_eq!(guild.read().members.len(), 1);
        assert_eq!(harness.names(), vec!["member_join", "member_join"]);
    }

    #[test]
    fn test_member_add_without_joined_flag_is_not_cached() {
        let mut harness = Harness::with_flags(MemberCacheFlags::ONLINE).with_guild();
        harness
            .send("GUILD_MEMBER_ADD", json!({"guild_id": "1", "user": user("7")}))
            .unwrap();

        assert!(harness.guild().read().get_member(Snowflake::new(7)).is_none());
        assert_eq!(harness.names(), vec!["member_join"]);
    }

    #[test]
    fn test_member_add_without_user_is_malformed() {
        let harness = Harness::new().with_guild();
        let err = harness
            .send("GUILD_MEMBER_ADD", json!({"guild_id": "1"}))
            .unwrap_err();
        assert!(matches!(err, StateError::Domain(DomainError::MissingField("user"))));
    }

    #[test]
    fn test_member_remove_unknown_member() {
        let harness = Harness::new().with_guild();
        let err = harness
            .send("GUILD_MEMBER_REMOVE", json!({"guild_id": "1", "user": {"id": "7"}}))
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::Domain(DomainError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_member_update_emits_user_and_member_changes() {
        let mut harness = Harness::new().with_guild();
        harness
            .send("GUILD_MEMBER_ADD", json!({"guild_id": "1", "user": user("7"), "roles": []}))
            .unwrap();
        harness.drain();

        harness
            .send(
                "GUILD_MEMBER_UPDATE",
                json!({
                    "guild_id": "1",
                    "user": {"id": "7", "username": "renamed", "discriminator": "0001"},
                    "roles": ["30"],
                    "nick": "Seven"
                }),
            )
            .unwrap();

        let events = harness.drain();
        assert_eq!(
            events.iter().map(ClientEvent::name).collect::<Vec<_>>(),
            vec!["user_update", "member_update"]
        );
        match &events[1] {
            ClientEvent::MemberUpdate { before, after } => {
                assert_eq!(before.nick, None);
                assert_eq!(after.nick.as_deref(), Some("Seven"));
                assert_eq!(after.role_ids, vec![Snowflake::new(30)]);
            }
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[test]
    fn test_members_chunk_without_nonce_is_dropped() {
        let mut harness = Harness::new().with_guild();
        harness
            .send(
                "GUILD_MEMBERS_CHUNK",
                json!({"guild_id": "1", "members": [{"user": user("7"), "roles": []}], "chunk_index": 0, "chunk_count": 1}),
            )
            .unwrap();
        assert!(harness.guild().read().get_member(Snowflake::new(7)).is_none());
        assert!(harness.drain().is_empty());
    }

    #[test]
    fn test_members_chunk_completes_request() {
        let mut harness = Harness::new().with_guild();
        let handle = harness
            .ctx
            .chunks
            .begin_request(Snowflake::new(GUILD), true);

        harness
            .send(
                "GUILD_MEMBERS_CHUNK",
                json!({
                    "guild_id": "1",
                    "nonce": handle.nonce(),
                    "chunk_index": 0,
                    "chunk_count": 1,
                    "members": [
                        {"user": user("7"), "roles": [], "joined_at": "2021-01-01T00:00:00+00:00"},
                        {"user": user("8"), "roles": []}
                    ],
                    "presences": [{"user": {"id": "8"}, "status": "idle"}]
                }),
            )
            .unwrap();

        assert!(handle.is_complete());
        let guild = harness.guild();
        assert_eq!(
            guild.read().get_member(Snowflake::new(8)).unwrap().presence.status,
            Status::Idle
        );
        match harness.drain().pop() {
            Some(ClientEvent::ChunkRequestResult(result)) => assert_eq!(result.members.len(), 2),
            other => panic!("unexpected event {:?}", other.map(|e| e.name())),
        }
    }

    #[test]
    fn test_member_list_sync_is_silent_and_update_reports() {
        let mut harness = Harness::new().with_guild();
        harness
            .send(
                "GUILD_MEMBER_LIST_UPDATE",
                json!({
                    "guild_id": "1",
                    "member_count": 40,
                    "groups": [{"id": "online", "count": 3}, {"id": "offline", "count": 37}],
                    "ops": [{"op": "SYNC", "range": [0, 99], "items": [
                        {"group": {"id": "online", "count": 3}},
                        {"member": {"user": user("7"), "roles": [], "presence": {"user": {"id": "7"}, "status": "online"}}}
                    ]}]
                }),
            )
            .unwrap();
        assert_eq!(harness.names(), vec!["raw_member_list_update"]);
        {
            let guild = harness.guild();
            let guild = guild.read();
            assert_eq!(guild.member_count, Some(40));
            assert_eq!(guild.online_count, Some(3));
            assert!(guild.get_member(Snowflake::new(7)).is_some());
        }

        harness
            .send(
                "GUILD_MEMBER_LIST_UPDATE",
                json!({
                    "guild_id": "1",
                    "member_count": 0,
                    "groups": [],
                    "ops": [{"op": "UPDATE", "index": 1, "item": {"member": {
                        "user": user("7"), "presence": {"user": {"id": "7"}, "status": "dnd"}
                    }}}]
                }),
            )
            .unwrap();
        assert_eq!(
            harness.names(),
            vec!["raw_member_list_update", "member_update"]
        );
        assert_eq!(harness.guild().read().member_count, Some(40));
    }

    #[test]
    fn test_member_list_update_materializes_unknown_member() {
        let mut harness = Harness::with_flags(MemberCacheFlags::ONLINE).with_guild();
        harness
            .send(
                "GUILD_MEMBER_LIST_UPDATE",
                json!({
                    "guild_id": "1",
                    "ops": [
                        {"op": "UPDATE", "item": {"member": {"user": user("7"), "presence": {"user": {"id": "7"}, "status": "online"}}}},
                        {"op": "INSERT", "item": {"member": {"user": user("8"), "presence": {"user": {"id": "8"}, "status": "offline"}}}}
                    ]
                }),
            )
            .unwrap();

        let guild = harness.guild();
        assert!(guild.read().get_member(Snowflake::new(7)).is_some());
        assert!(guild.read().get_member(Snowflake::new(8)).is_none());
        assert_eq!(harness.names(), vec!["raw_member_list_update"]);
    }

    #[test]
    fn test_member_list_update_for_unknown_guild_still_emits_raw() {
        let mut harness = Harness::new();
        let err = harness
            .send("GUILD_MEMBER_LIST_UPDATE", json!({"guild_id": "9"}))
            .unwrap_err();
        assert!(matches!(err, StateError::Domain(DomainError::UnknownGuild(_))));
        assert_eq!(harness.names(), vec!["raw_member_list_update"]);
    }
}
