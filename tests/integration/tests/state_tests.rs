//! State engine integration tests
//!
//! Each test drives a full engine with dispatch records and a recording
//! command sink; nothing leaves the process.
//!
//! Run with: cargo test -p relay-integration-tests --test state_tests

use std::time::Duration;

use chrono::{TimeZone, Utc};
use relay_integration_tests::{fixtures::*, sf, test_config, SentCommand, TestSession, WAIT};
use relay_core::{Snowflake, Status};
use relay_state::store::PRIVATE_CHANNEL_CAPACITY;
use relay_state::{ClientEvent, GuildHydration, MemberQuery, SessionPhase, StateError};
use serde_json::json;

/// Session with startup chunking and subscriptions switched off
fn quiet_session() -> TestSession {
    let mut config = test_config();
    config.chunking.chunk_guilds_at_startup = false;
    config.subscription.auto_subscribe = false;
    TestSession::with_config(config)
}

async fn connected_quiet_session(guilds: Vec<serde_json::Value>) -> TestSession {
    let session = quiet_session();
    let count = guilds.len();
    session
        .baseline(ready(guilds), supplemental(count))
        .expect("baseline rejected");
    session.wait_ready().await.expect("session never ready");
    session
}

// ============================================================================
// Startup Hydration
// ============================================================================

#[tokio::test]
async fn test_baseline_hydrates_and_reports_ready_once() {
    let mut session = TestSession::new();

    // Guild 1 is owned by the session user and needs chunking; guild 2 does not
    session
        .baseline(
            ready(vec![ready_guild(1, SELF_ID), ready_guild(2, 999)]),
            supplemental(2),
        )
        .unwrap();
    assert_eq!(session.engine.phase(), SessionPhase::Hydrating);

    let request = session.next_member_request().await.unwrap();
    assert_eq!(request.guild_id, sf(1));
    assert_eq!(request.limit, 0);
    assert_eq!(request.query.as_deref(), Some(""));

    session
        .send(
            "GUILD_MEMBERS_CHUNK",
            members_chunk(1, &request.nonce, &[SELF_ID, 201, 202, 203, 204], 0, 1),
        )
        .unwrap();

    session.wait_for_event("ready").await.unwrap();
    assert_eq!(session.engine.phase(), SessionPhase::Ready);

    let guild = session.engine.store().get_guild(sf(1)).unwrap();
    assert_eq!(guild.read().members.len(), 5);
    assert!(guild.read().chunked);
    assert!(!session.engine.store().get_guild(sf(2)).unwrap().read().chunked);
    assert_eq!(session.engine.hydration_state(sf(1)), Some(GuildHydration::Settled));

    let sent = session.sent_commands().await;
    assert!(!sent
        .iter()
        .any(|c| matches!(c, SentCommand::RequestMembers(_))));
    assert!(sent.contains(&SentCommand::RequestGuild(sf(2))));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!session.drain_names().contains(&"ready"));
}

#[tokio::test]
async fn test_connect_precedes_ready() {
    let mut session = quiet_session();
    session
        .baseline(ready(vec![ready_guild(1, 999)]), supplemental(1))
        .unwrap();

    let first = session.wait_for_event("connect").await;
    assert!(first.is_ok());
    session.wait_for_event("ready").await.unwrap();
}

#[tokio::test]
async fn test_hydration_timeout_still_reaches_ready() {
    let mut session = TestSession::new();
    session
        .baseline(ready(vec![ready_guild(1, SELF_ID)]), supplemental(1))
        .unwrap();
    session.next_member_request().await.unwrap();

    // No reply; the 500ms ready timeout lets the session proceed
    session.wait_for_event("ready").await.unwrap();
    let guild = session.engine.store().get_guild(sf(1)).unwrap();
    assert!(!guild.read().chunked);
}

#[tokio::test]
async fn test_resync_cancels_running_hydration() {
    let mut session = TestSession::new();
    session
        .baseline(ready(vec![ready_guild(1, SELF_ID)]), supplemental(1))
        .unwrap();
    let first = session.next_member_request().await.unwrap();

    // A fresh baseline supersedes the running hydration
    session.send("READY", ready(vec![ready_guild(1, SELF_ID)])).unwrap();
    assert_eq!(session.engine.phase(), SessionPhase::AwaitingBaseline);
    session.send("READY_SUPPLEMENTAL", supplemental(1)).unwrap();

    let second = session.next_member_request().await.unwrap();
    assert_ne!(first.nonce, second.nonce);
    assert_eq!(session.engine.pending_chunk_requests(), 1);

    session
        .send(
            "GUILD_MEMBERS_CHUNK",
            members_chunk(1, &second.nonce, &[201, 202], 0, 1),
        )
        .unwrap();
    session.wait_for_event("ready").await.unwrap();

    // The first session would have timed out by now; it never reports
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(!session.drain_names().contains(&"ready"));
    assert_eq!(session.engine.phase(), SessionPhase::Ready);
}

#[tokio::test]
async fn test_supplemental_truncates_to_shortest_list() {
    // Three guilds, but only two member lists in the supplement
    let session = quiet_session();
    session
        .baseline(
            ready(vec![ready_guild(1, 999), ready_guild(2, 999), ready_guild(3, 999)]),
            supplemental_lists(3, 2, 3),
        )
        .unwrap();

    let store = session.engine.store();
    assert_eq!(store.guild_count(), 3);
    for id in [1, 2] {
        let guild = store.get_guild(sf(id)).unwrap();
        assert!(guild.read().get_member(sf(SELF_ID)).is_some());
    }
    let third = store.get_guild(sf(3)).unwrap();
    assert!(third.read().get_member(sf(SELF_ID)).is_none());
    assert_eq!(third.read().channels.len(), 1);
}

#[tokio::test]
async fn test_unavailable_guild_in_baseline_becomes_available() {
    let mut session = quiet_session();
    session
        .baseline(
            ready(vec![ready_guild(1, 999), unavailable_guild(2)]),
            supplemental(2),
        )
        .unwrap();
    session.wait_ready().await.unwrap();
    assert!(session.engine.store().get_guild(sf(2)).is_none());

    session.send("GUILD_CREATE", ready_guild(2, 999)).unwrap();
    match session.wait_for_event("guild_available").await.unwrap() {
        ClientEvent::GuildAvailable(guild) => assert_eq!(guild.read().id, sf(2)),
        other => panic!("unexpected event {}", other.name()),
    }
}

// ============================================================================
// Guild Lifecycle
// ============================================================================

#[tokio::test]
async fn test_guild_delete_unavailable_then_removed() {
    let mut session = connected_quiet_session(vec![ready_guild(1, 999)]).await;
    session.drain_names();

    session
        .send("GUILD_DELETE", json!({"id": "1", "unavailable": true}))
        .unwrap();
    let guild = session.engine.store().get_guild(sf(1)).unwrap();
    assert!(guild.read().unavailable);
    assert_eq!(session.drain_names(), vec!["guild_unavailable"]);

    session.send("GUILD_DELETE", json!({"id": "1"})).unwrap();
    assert!(session.engine.store().get_guild(sf(1)).is_none());
    assert_eq!(session.drain_names(), vec!["guild_remove"]);
}

#[tokio::test]
async fn test_joined_guild_is_chunked_before_announcement() {
    let mut config = test_config();
    config.subscription.auto_subscribe = false;
    let mut session = TestSession::with_config(config);
    session
        .baseline(ready(vec![ready_guild(1, 999)]), supplemental(1))
        .unwrap();
    session.wait_ready().await.unwrap();

    session.send("GUILD_CREATE", ready_guild(3, SELF_ID)).unwrap();
    let request = session.next_member_request().await.unwrap();
    assert_eq!(request.guild_id, sf(3));
    assert!(!session.drain_names().contains(&"guild_join"));

    session
        .send(
            "GUILD_MEMBERS_CHUNK",
            members_chunk(3, &request.nonce, &[SELF_ID, 301], 0, 1),
        )
        .unwrap();
    session.wait_for_event("guild_join").await.unwrap();

    let guild = session.engine.store().get_guild(sf(3)).unwrap();
    assert!(guild.read().chunked);
    assert_eq!(guild.read().members.len(), 2);
}

// ============================================================================
// Chunking
// ============================================================================

#[tokio::test]
async fn test_chunk_completion_is_monotonic() {
    let mut session = connected_quiet_session(vec![ready_guild(1, SELF_ID)]).await;
    let handle = session.engine.chunk_guild(sf(1)).await.unwrap();
    let nonce = handle.nonce().to_string();

    for (index, ids) in [[201, 202], [203, 204], [205, 206]].iter().enumerate() {
        session
            .send("GUILD_MEMBERS_CHUNK", members_chunk(1, &nonce, ids, index as u32, 3))
            .unwrap();
    }

    let members = handle.wait(WAIT).await.unwrap();
    let ids: Vec<Snowflake> = members.iter().map(|m| m.user_id).collect();
    assert_eq!(ids, (201..=206).map(sf).collect::<Vec<_>>());

    // A duplicate final batch after completion changes nothing
    session
        .send("GUILD_MEMBERS_CHUNK", members_chunk(1, &nonce, &[207], 2, 3))
        .unwrap();
    let guild = session.engine.store().get_guild(sf(1)).unwrap();
    assert!(guild.read().get_member(sf(207)).is_none());

    let results = session
        .drain_names()
        .into_iter()
        .filter(|n| *n == "chunk_request_result")
        .count();
    assert_eq!(results, 1);
    assert_eq!(session.engine.pending_chunk_requests(), 0);
}

#[tokio::test]
async fn test_concurrent_chunk_requests_share_one_command() {
    let session = connected_quiet_session(vec![ready_guild(1, SELF_ID)]).await;
    session.sent_commands().await;

    let first = session.engine.chunk_guild(sf(1)).await.unwrap();
    let second = session.engine.chunk_guild(sf(1)).await.unwrap();
    assert_eq!(first.nonce(), second.nonce());

    let requests = session
        .sent_commands()
        .await
        .into_iter()
        .filter(|c| matches!(c, SentCommand::RequestMembers(_)))
        .count();
    assert_eq!(requests, 1);
}

#[tokio::test]
async fn test_query_timeout_keeps_request_for_late_reply() {
    let session = connected_quiet_session(vec![ready_guild(1, 999)]).await;

    let query = MemberQuery::by_name(sf(1), "late", 10);
    let engine = std::sync::Arc::clone(&session.engine);
    let waiter = tokio::spawn(async move { engine.query_members(query).await });

    let request = session.next_member_request().await.unwrap();
    assert_eq!(request.query.as_deref(), Some("late"));

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(StateError::ChunkTimeout { .. })));
    assert_eq!(session.engine.pending_chunk_requests(), 1);

    // The late reply is still merged into the cache
    session
        .send(
            "GUILD_MEMBERS_CHUNK",
            members_chunk(1, &request.nonce, &[401], 0, 1),
        )
        .unwrap();
    let guild = session.engine.store().get_guild(sf(1)).unwrap();
    assert!(guild.read().get_member(sf(401)).is_some());
    assert_eq!(session.engine.pending_chunk_requests(), 0);
}

// ============================================================================
// Members
// ============================================================================

#[tokio::test]
async fn test_presence_update_preserves_nickname() {
    let session = connected_quiet_session(vec![ready_guild(1, 999)]).await;
    let mut add = member(7, Some("Bob"));
    add["guild_id"] = json!("1");
    session.send("GUILD_MEMBER_ADD", add).unwrap();

    session
        .send("PRESENCE_UPDATE", presence(1, 7, "dnd"))
        .unwrap();

    let guild = session.engine.store().get_guild(sf(1)).unwrap();
    let guild = guild.read();
    let member = guild.get_member(sf(7)).unwrap();
    assert_eq!(member.nick.as_deref(), Some("Bob"));
    assert_eq!(member.presence.status, Status::Dnd);
    assert!(member.joined_at.is_some());
}

#[tokio::test]
async fn test_member_update_is_idempotent() {
    let session = connected_quiet_session(vec![ready_guild(1, 999)]).await;
    let mut update = member(7, Some("Bob"));
    update["guild_id"] = json!("1");

    let snapshot = |session: &TestSession| {
        let guild = session.engine.store().get_guild(sf(1)).unwrap();
        let guild = guild.read();
        let member = guild.get_member(sf(7)).unwrap();
        let user = member.user.read().clone();
        (
            member.nick.clone(),
            member.role_ids.clone(),
            member.joined_at,
            member.presence.clone(),
            user,
        )
    };

    session.send("GUILD_MEMBER_UPDATE", update.clone()).unwrap();
    let once = snapshot(&session);
    session.send("GUILD_MEMBER_UPDATE", update).unwrap();
    let twice = snapshot(&session);
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_held_user_reference_observes_updates() {
    let session = connected_quiet_session(vec![ready_guild(1, 999)]).await;
    let mut add = member(7, None);
    add["guild_id"] = json!("1");
    session.send("GUILD_MEMBER_ADD", add).unwrap();

    let held = session.engine.store().get_user(sf(7)).unwrap();
    session
        .send(
            "PRESENCE_UPDATE",
            json!({"guild_id": "1", "user": {"id": "7", "username": "renamed"}, "status": "online"}),
        )
        .unwrap();
    assert_eq!(held.read().name, "renamed");
}

// ============================================================================
// Private Channels
// ============================================================================

#[tokio::test]
async fn test_private_channel_lru_evicts_least_recent() {
    let session = quiet_session();
    let capacity = PRIVATE_CHANNEL_CAPACITY as i64;
    for id in 1..=capacity {
        session
            .send("CHANNEL_CREATE", dm_channel(id, 10_000 + id))
            .unwrap();
    }

    // Touch the oldest so the second oldest becomes the eviction candidate
    assert!(session.engine.store().get_private_channel(sf(1)).is_some());
    session
        .send("CHANNEL_CREATE", dm_channel(capacity + 1, 10_000 + capacity + 1))
        .unwrap();

    let store = session.engine.store();
    assert_eq!(store.private_channel_count(), PRIVATE_CHANNEL_CAPACITY);
    assert!(store.get_private_channel(sf(1)).is_some());
    assert!(store.get_private_channel(sf(2)).is_none());
    assert!(store.get_dm_channel(sf(10_002)).is_none());
    assert!(store.get_private_channel(sf(capacity + 1)).is_some());
}

// ============================================================================
// Identifiers
// ============================================================================

#[test]
fn test_snowflake_timestamp_round_trip_bounds() {
    for raw in [175_928_847_299_117_063_i64, 81_384_788_765_712_384, 1 << 22] {
        let id = Snowflake::new(raw);
        let at = id.created_at();
        assert!(Snowflake::from_datetime(at, false) <= id);
        assert!(Snowflake::from_datetime(at, true) >= id);
    }

    let at = Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap();
    let lower = Snowflake::from_datetime(at, false);
    assert_eq!(lower.created_at(), at);
}
