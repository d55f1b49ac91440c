//! Outbound commands the engine needs from the transport layer

use async_trait::async_trait;
use relay_core::Snowflake;
use serde::Serialize;
use thiserror::Error;

/// REQUEST_GUILD_MEMBERS payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRequest {
    pub guild_id: Snowflake,
    /// Name prefix; omitted when searching by id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Zero means no limit (full guild)
    pub limit: u32,
    pub presences: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<Snowflake>,
    pub nonce: String,
}

impl MemberRequest {
    /// Request every member of a guild
    pub fn full_guild(guild_id: Snowflake, nonce: impl Into<String>) -> Self {
        Self {
            guild_id,
            query: Some(String::new()),
            limit: 0,
            presences: true,
            user_ids: Vec::new(),
            nonce: nonce.into(),
        }
    }
}

/// Outbound command errors
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("Gateway connection is closed")]
    Closed,

    #[error("Command rejected: {0}")]
    Rejected(String),
}

/// Commands sent back over the session's connection.
///
/// Implementations own retry and rate limiting; the engine treats each call
/// as fire-and-forget beyond awaiting it.
#[async_trait]
pub trait GatewayCommands: Send + Sync {
    /// Ask for member chunks; replies arrive as GUILD_MEMBERS_CHUNK
    async fn request_members(&self, request: MemberRequest) -> Result<(), OutboundError>;

    /// Ask the server to (re)send a guild, typically as GUILD_CREATE
    async fn request_guild(&self, guild_id: Snowflake) -> Result<(), OutboundError>;

    /// Keep presence and member list data flowing for a guild
    async fn subscribe_guild(&self, guild_id: Snowflake, max_online: u32)
        -> Result<(), OutboundError>;
}
