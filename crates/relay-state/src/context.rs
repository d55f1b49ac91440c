//! Shared engine context
//!
//! Everything a handler or a background hydration task needs, behind one
//! `Arc`.

use relay_common::{AppConfig, MemberCacheFlags};
use relay_core::{Member, Permissions, Snowflake};
use std::sync::Arc;

use crate::chunk::{ChunkCoordinator, ChunkHandle};
use crate::error::{StateError, StateResult};
use crate::events::EventEmitter;
use crate::outbound::{GatewayCommands, MemberRequest};
use crate::store::EntityStore;

/// Parameters of a one-shot member search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberQuery {
    pub guild_id: Snowflake,
    /// Name prefix; `None` when searching by id
    pub query: Option<String>,
    pub limit: u32,
    pub user_ids: Vec<Snowflake>,
    /// Merge results into the guild cache
    pub cache: bool,
    pub presences: bool,
}

impl MemberQuery {
    /// Prefix search
    pub fn by_name(guild_id: Snowflake, query: impl Into<String>, limit: u32) -> Self {
        Self {
            guild_id,
            query: Some(query.into()),
            limit,
            user_ids: Vec::new(),
            cache: true,
            presences: false,
        }
    }

    /// Resolve specific users
    pub fn by_ids(guild_id: Snowflake, user_ids: Vec<Snowflake>) -> Self {
        Self {
            guild_id,
            query: None,
            limit: u32::try_from(user_ids.len()).unwrap_or(u32::MAX),
            user_ids,
            cache: true,
            presences: false,
        }
    }
}

pub struct StateContext {
    pub config: AppConfig,
    pub store: Arc<EntityStore>,
    pub chunks: ChunkCoordinator,
    pub events: EventEmitter,
    pub commands: Arc<dyn GatewayCommands>,
}

impl StateContext {
    pub fn new(config: AppConfig, commands: Arc<dyn GatewayCommands>) -> Self {
        let store = Arc::new(EntityStore::new(config.state.message_capacity()));
        Self {
            chunks: ChunkCoordinator::new(Arc::clone(&store)),
            events: EventEmitter::new(config.state.event_buffer),
            store,
            commands,
            config,
        }
    }

    pub fn cache_flags(&self) -> MemberCacheFlags {
        self.config.state.member_cache_flags
    }

    /// Request every member of a guild.
    ///
    /// Shares the outstanding request if one exists; the command is only sent
    /// for a new one.
    pub async fn chunk_guild(&self, guild_id: Snowflake) -> StateResult<ChunkHandle> {
        let cache = self.cache_flags().contains(MemberCacheFlags::JOINED);
        let (handle, created) = self.chunks.begin_guild_request(guild_id, cache);

        if created {
            let request = MemberRequest::full_guild(guild_id, handle.nonce());
            if let Err(e) = self.commands.request_members(request).await {
                self.chunks.abandon(&handle);
                return Err(e.into());
            }
        }
        Ok(handle)
    }

    /// Search a guild's members and wait for the reply
    pub async fn query_members(&self, query: MemberQuery) -> StateResult<Arc<[Member]>> {
        if self.store.me().is_none() {
            return Err(StateError::NotConnected);
        }
        if self.store.get_guild(query.guild_id).is_none() {
            return Err(relay_core::DomainError::UnknownGuild(query.guild_id).into());
        }

        let handle = self.chunks.begin_request(query.guild_id, query.cache);
        let request = MemberRequest {
            guild_id: query.guild_id,
            query: query.query.clone(),
            limit: query.limit,
            presences: query.presences,
            user_ids: query.user_ids.clone(),
            nonce: handle.nonce().to_string(),
        };
        if let Err(e) = self.commands.request_members(request).await {
            self.chunks.abandon(&handle);
            return Err(e.into());
        }

        let timeout = self.config.chunking.query_timeout();
        handle.wait(timeout).await.inspect_err(|e| {
            if matches!(e, StateError::ChunkTimeout { .. }) {
                tracing::warn!(
                    guild_id = %query.guild_id,
                    query = ?query.query,
                    limit = query.limit,
                    "Timed out waiting for member query"
                );
            }
        })
    }

    /// Startup chunking applies to guilds the session user can manage
    pub fn guild_needs_chunking(&self, guild_id: Snowflake) -> bool {
        if !self.config.chunking.chunk_guilds_at_startup
            || !self.cache_flags().contains(MemberCacheFlags::JOINED)
        {
            return false;
        }
        let (Some(self_id), Some(guild)) = (self.store.self_id(), self.store.get_guild(guild_id))
        else {
            return false;
        };

        let guild = guild.read();
        !guild.chunked
            && guild
                .member_permissions(self_id)
                .contains(Permissions::MANAGE_GUILD)
    }

    pub fn guild_needs_subscribing(&self, guild_id: Snowflake) -> bool {
        self.config.subscription.auto_subscribe
            && self
                .store
                .get_guild(guild_id)
                .is_some_and(|guild| !guild.read().subscribed)
    }

    /// Send the subscription command and flag the guild
    pub async fn subscribe_guild(&self, guild_id: Snowflake) -> StateResult<()> {
        self.commands
            .subscribe_guild(guild_id, self.config.subscription.max_online)
            .await?;
        if let Some(guild) = self.store.get_guild(guild_id) {
            guild.write().subscribed = true;
        }
        tracing::debug!(guild_id = %guild_id, "Subscribed to guild");
        Ok(())
    }
}

impl std::fmt::Debug for StateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContext")
            .field("store", &self.store)
            .field("chunks", &self.chunks)
            .finish_non_exhaustive()
    }
}
