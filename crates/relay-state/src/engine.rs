//! Engine facade
//!
//! Wires the store, chunk coordinator, sequencer and dispatcher together and
//! exposes what the surrounding application needs.

use relay_common::AppConfig;
use relay_core::{Member, Snowflake};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

use crate::chunk::ChunkHandle;
use crate::context::{MemberQuery, StateContext};
use crate::dispatch::EventDispatcher;
use crate::error::{StateError, StateResult};
use crate::events::{ClientEvent, GatewayRecord};
use crate::outbound::GatewayCommands;
use crate::ready::{GuildHydration, ReadinessSequencer, SessionPhase};
use crate::store::EntityStore;

/// Client-side state synchronization engine.
///
/// Feed it dispatch records in delivery order through [`StateEngine::dispatch`]
/// or [`StateEngine::run`]; read the mirrored state through
/// [`StateEngine::store`] and follow changes through [`StateEngine::subscribe`].
pub struct StateEngine {
    ctx: Arc<StateContext>,
    sequencer: Arc<ReadinessSequencer>,
    dispatcher: EventDispatcher,
}

impl StateEngine {
    pub fn new(config: AppConfig, commands: Arc<dyn GatewayCommands>) -> Self {
        tracing::debug!(
            cache_flags = ?config.state.member_cache_flags,
            max_messages = config.state.message_capacity(),
            "Creating state engine"
        );
        let ctx = Arc::new(StateContext::new(config, commands));
        let sequencer = Arc::new(ReadinessSequencer::new());
        let dispatcher = EventDispatcher::new(Arc::clone(&ctx), Arc::clone(&sequencer));
        Self {
            ctx,
            sequencer,
            dispatcher,
        }
    }

    /// Apply a single record
    pub fn dispatch(&self, record: GatewayRecord) -> StateResult<()> {
        self.dispatcher.dispatch(record)
    }

    /// Apply records until the sender side closes
    pub async fn run(&self, records: mpsc::Receiver<GatewayRecord>) {
        self.dispatcher.run(records).await;
    }

    /// Receive semantic events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.ctx.events.subscribe()
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.ctx.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.ctx.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.sequencer.phase()
    }

    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.sequencer.watch_phase()
    }

    /// Hydration progress of a guild during the current session
    pub fn hydration_state(&self, guild_id: Snowflake) -> Option<GuildHydration> {
        self.sequencer.guild_state(guild_id)
    }

    /// Wait for the session to report ready; `NotConnected` if it does not
    /// within `timeout`
    pub async fn wait_until_ready(&self, timeout: Duration) -> StateResult<()> {
        let mut phase = self.watch_phase();
        let outcome = match tokio::time::timeout(timeout, phase.wait_for(|p| *p == SessionPhase::Ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(StateError::Cancelled),
            Err(_) => Err(StateError::NotConnected),
        };
        outcome
    }

    /// Request every member of a guild.
    ///
    /// The returned handle completes when the final batch arrives; an
    /// outstanding request for the same guild is shared.
    pub async fn chunk_guild(&self, guild_id: Snowflake) -> StateResult<ChunkHandle> {
        if self.ctx.store.me().is_none() {
            return Err(StateError::NotConnected);
        }
        if self.ctx.store.get_guild(guild_id).is_none() {
            return Err(relay_core::DomainError::UnknownGuild(guild_id).into());
        }
        self.ctx.chunk_guild(guild_id).await
    }

    /// Search a guild's members and wait for the reply
    pub async fn query_members(&self, query: MemberQuery) -> StateResult<Arc<[Member]>> {
        self.ctx.query_members(query).await
    }

    /// Subscribe a guild to presence and member list updates
    pub async fn subscribe_guild(&self, guild_id: Snowflake) -> StateResult<()> {
        if self.ctx.store.get_guild(guild_id).is_none() {
            return Err(relay_core::DomainError::UnknownGuild(guild_id).into());
        }
        self.ctx.subscribe_guild(guild_id).await
    }

    /// Member requests still waiting for their final batch
    pub fn pending_chunk_requests(&self) -> usize {
        self.ctx.chunks.pending()
    }

    /// Abandon any running hydration; the next baseline starts over
    pub fn cancel_hydration(&self) -> bool {
        self.sequencer.cancel()
    }
}

impl std::fmt::Debug for StateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateEngine")
            .field("phase", &self.phase())
            .field("store", &self.ctx.store)
            .field("pending_chunks", &self.pending_chunk_requests())
            .finish_non_exhaustive()
    }
}
