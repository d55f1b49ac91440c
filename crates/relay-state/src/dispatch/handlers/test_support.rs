//! Shared harness for handler tests

use async_trait::async_trait;
use relay_common::{AppConfig, MemberCacheFlags};
use relay_core::{Guild, GuildRef, Snowflake, User};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::context::StateContext;
use crate::dispatch::EventDispatcher;
use crate::error::StateResult;
use crate::events::{ClientEvent, GatewayRecord};
use crate::outbound::{GatewayCommands, MemberRequest, OutboundError};
use crate::ready::ReadinessSequencer;

pub(crate) const ME: i64 = 100;
pub(crate) const GUILD: i64 = 1;

pub(crate) struct NullCommands;

#[async_trait]
impl GatewayCommands for NullCommands {
    async fn request_members(&self, _request: MemberRequest) -> Result<(), OutboundError> {
        Ok(())
    }

    async fn request_guild(&self, _guild_id: Snowflake) -> Result<(), OutboundError> {
        Ok(())
    }

    async fn subscribe_guild(&self, _guild_id: Snowflake, _max_online: u32) -> Result<(), OutboundError> {
        Ok(())
    }
}

pub(crate) struct Harness {
    pub dispatcher: EventDispatcher,
    pub ctx: Arc<StateContext>,
    pub events: broadcast::Receiver<ClientEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_flags(MemberCacheFlags::all())
    }

    /// Session user installed, startup chunking and subscriptions off
    pub fn with_flags(flags: MemberCacheFlags) -> Self {
        let mut config = AppConfig::default();
        config.state.member_cache_flags = flags;
        config.chunking.chunk_guilds_at_startup = false;
        config.subscription.auto_subscribe = false;

        let ctx = Arc::new(StateContext::new(config, Arc::new(NullCommands)));
        ctx.store
            .set_me(User::new(Snowflake::new(ME), "me", "0001").into_ref());
        let events = ctx.events.subscribe();
        let dispatcher = EventDispatcher::new(Arc::clone(&ctx), Arc::new(ReadinessSequencer::new()));

        Self {
            dispatcher,
            ctx,
            events,
        }
    }

    /// Add guild `GUILD`, owned by the session user
    pub fn with_guild(self) -> Self {
        self.ctx
            .store
            .add_guild(Guild::new(Snowflake::new(GUILD), "guild", Snowflake::new(ME)).into_ref());
        self
    }

    pub fn guild(&self) -> GuildRef {
        self.ctx.store.get_guild(Snowflake::new(GUILD)).unwrap()
    }

    pub fn send(&self, t: &str, d: Value) -> StateResult<()> {
        self.dispatcher.dispatch(GatewayRecord::new(t, d))
    }

    pub fn drain(&mut self) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(ClientEvent::name).collect()
    }
}
