//! Test fixtures and payload builders
//!
//! Dispatch payloads in wire shape, built with `serde_json::json!`.

use serde_json::{json, Value};

/// Session user id used by every fixture
pub const SELF_ID: i64 = 100;

pub fn user(id: i64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "username": name,
        "discriminator": format!("{:04}", id % 10_000),
    })
}

/// Full member record with a join timestamp
pub fn member(id: i64, nick: Option<&str>) -> Value {
    json!({
        "user": user(id, &format!("user{id}")),
        "nick": nick,
        "roles": [],
        "joined_at": "2021-06-01T12:00:00+00:00",
        "deaf": false,
        "mute": false
    })
}

/// Guild as listed in READY; `owner_id` decides whether the session user
/// may chunk it
pub fn ready_guild(id: i64, owner_id: i64) -> Value {
    json!({
        "id": id.to_string(),
        "name": format!("guild {id}"),
        "owner_id": owner_id.to_string(),
        "member_count": 5,
        "channels": [
            {"id": (id * 10).to_string(), "type": 0, "name": "general"}
        ],
        "roles": [
            {"id": id.to_string(), "name": "@everyone", "permissions": "0"}
        ]
    })
}

pub fn unavailable_guild(id: i64) -> Value {
    json!({"id": id.to_string(), "unavailable": true})
}

/// READY with the given guilds and one member list per guild (self only)
pub fn ready(guilds: Vec<Value>) -> Value {
    let members: Vec<Value> = guilds
        .iter()
        .map(|_| json!([{"user_id": SELF_ID.to_string(), "roles": []}]))
        .collect();
    json!({
        "user": user(SELF_ID, "me"),
        "session_id": "session",
        "guilds": guilds,
        "users": [],
        "relationships": [],
        "private_channels": [],
        "merged_members": members
    })
}

/// READY_SUPPLEMENTAL with `count` empty entries in every list
pub fn supplemental(count: usize) -> Value {
    supplemental_lists(count, count, count)
}

/// READY_SUPPLEMENTAL with independently sized lists
pub fn supplemental_lists(guilds: usize, members: usize, presences: usize) -> Value {
    json!({
        "guilds": (0..guilds).map(|_| json!({"voice_states": []})).collect::<Vec<_>>(),
        "merged_members": (0..members).map(|_| json!([])).collect::<Vec<_>>(),
        "merged_presences": {
            "guilds": (0..presences).map(|_| json!([])).collect::<Vec<_>>(),
            "friends": []
        }
    })
}

/// One GUILD_MEMBERS_CHUNK batch
pub fn members_chunk(
    guild_id: i64,
    nonce: &str,
    member_ids: &[i64],
    chunk_index: u32,
    chunk_count: u32,
) -> Value {
    json!({
        "guild_id": guild_id.to_string(),
        "members": member_ids.iter().map(|id| member(*id, None)).collect::<Vec<_>>(),
        "chunk_index": chunk_index,
        "chunk_count": chunk_count,
        "nonce": nonce
    })
}

pub fn presence(guild_id: i64, user_id: i64, status: &str) -> Value {
    json!({
        "guild_id": guild_id.to_string(),
        "user": {"id": user_id.to_string()},
        "status": status,
        "activities": []
    })
}

pub fn dm_channel(id: i64, recipient_id: i64) -> Value {
    json!({
        "id": id.to_string(),
        "type": 1,
        "recipients": [user(recipient_id, &format!("user{recipient_id}"))]
    })
}
