//! Readiness sequencer - startup and per-guild hydration
//!
//! Hydration runs as spawned tasks. A resynchronization bumps the session
//! generation and aborts them; a task that slipped past its last await
//! checks the generation under the slot lock before touching anything, so a
//! superseded session never reports ready.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use relay_core::Snowflake;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::AbortHandle;

use super::phase::{GuildHydration, SessionPhase};
use crate::context::StateContext;
use crate::error::StateError;
use crate::events::ClientEvent;
use crate::store::UnavailableKind;

#[derive(Default)]
struct SessionSlot {
    generation: u64,
    task: Option<AbortHandle>,
}

pub struct ReadinessSequencer {
    phase: watch::Sender<SessionPhase>,
    slot: Mutex<SessionSlot>,
    guilds: DashMap<Snowflake, GuildHydration>,
    /// GUILD_CREATE hydration tasks, at most one per guild
    in_flight: DashMap<Snowflake, AbortHandle>,
}

impl ReadinessSequencer {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(SessionPhase::Connecting);
        Self {
            phase,
            slot: Mutex::new(SessionSlot::default()),
            guilds: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    pub fn guild_state(&self, guild_id: Snowflake) -> Option<GuildHydration> {
        self.guilds.get(&guild_id).map(|entry| *entry.value())
    }

    /// Whether a GUILD_CREATE hydration is running for the guild
    pub fn is_hydrating(&self, guild_id: Snowflake) -> bool {
        self.in_flight.contains_key(&guild_id)
    }

    fn set_phase(&self, phase: SessionPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::info!(from = %previous, to = %phase, "Session phase changed");
        }
    }

    /// A baseline snapshot started arriving; supersedes any running hydration
    pub fn begin_baseline(&self) {
        self.cancel();
        self.set_phase(SessionPhase::AwaitingBaseline);
    }

    /// Abort session and guild hydration without waiting for them.
    ///
    /// Returns true if a session hydration was running.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let cancelled = match slot.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        };

        for entry in &self.in_flight {
            entry.value().abort();
        }
        self.in_flight.clear();
        self.guilds.clear();

        if cancelled {
            tracing::info!(generation = slot.generation, "Cancelled session hydration");
        }
        cancelled
    }

    /// Run startup hydration for the baseline's guilds, then report ready
    pub fn start_hydration(self: &Arc<Self>, ctx: Arc<StateContext>, guild_ids: Vec<Snowflake>) {
        let mut slot = self.slot.lock();
        let generation = slot.generation;
        self.set_phase(SessionPhase::Hydrating);
        for guild_id in &guild_ids {
            self.guilds.insert(*guild_id, GuildHydration::Queued);
        }

        let sequencer = Arc::clone(self);
        let task = tokio::spawn(async move {
            sequencer.hydrate_session(ctx, guild_ids, generation).await;
        });
        slot.task = Some(task.abort_handle());
    }

    async fn hydrate_session(&self, ctx: Arc<StateContext>, guild_ids: Vec<Snowflake>, generation: u64) {
        let mut waits = Vec::new();
        let mut subscribes = Vec::new();

        for &guild_id in &guild_ids {
            if let Err(e) = ctx.commands.request_guild(guild_id).await {
                StateError::from(e).log("READY_SUPPLEMENTAL");
            }

            if ctx.guild_needs_chunking(guild_id) {
                match ctx.chunk_guild(guild_id).await {
                    Ok(handle) => {
                        self.guilds.insert(guild_id, GuildHydration::Chunking);
                        waits.push(handle);
                    }
                    Err(e) => e.log("READY_SUPPLEMENTAL"),
                }
            }

            if ctx.guild_needs_subscribing(guild_id) {
                subscribes.push(guild_id);
            }
        }

        let timeout = ctx.config.chunking.ready_timeout();
        let results = join_all(waits.iter().map(|handle| handle.wait(timeout))).await;
        for (handle, result) in waits.iter().zip(results) {
            match result {
                Ok(members) => {
                    tracing::debug!(guild_id = %handle.guild_id(), count = members.len(), "Guild chunked");
                }
                Err(StateError::ChunkTimeout { .. }) => {
                    StateError::HydrationTimeout(handle.guild_id()).log("READY_SUPPLEMENTAL");
                }
                Err(e) => e.log("READY_SUPPLEMENTAL"),
            }
        }

        for &guild_id in &guild_ids {
            if !subscribes.contains(&guild_id) {
                self.guilds.insert(guild_id, GuildHydration::Settled);
            }
        }

        let gate = Semaphore::new(ctx.config.subscription.concurrent_guilds.max(1));
        join_all(subscribes.iter().map(|&guild_id| {
            let gate = &gate;
            let ctx = &ctx;
            async move {
                let Ok(_permit) = gate.acquire().await else {
                    return;
                };
                self.guilds.insert(guild_id, GuildHydration::Subscribing);
                if let Err(e) = ctx.subscribe_guild(guild_id).await {
                    e.log("READY_SUPPLEMENTAL");
                }
                self.guilds.insert(guild_id, GuildHydration::Settled);
            }
        }))
        .await;

        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        slot.task = None;
        self.set_phase(SessionPhase::Ready);
        ctx.events.emit(ClientEvent::Ready);
    }

    /// Chunk and/or subscribe a guild that arrived through GUILD_CREATE, then
    /// announce it.
    ///
    /// Returns false if a hydration for the guild is already running.
    pub fn hydrate_guild(
        self: &Arc<Self>,
        ctx: Arc<StateContext>,
        guild_id: Snowflake,
        chunk: bool,
        subscribe: bool,
    ) -> bool {
        let generation = self.slot.lock().generation;

        match self.in_flight.entry(guild_id) {
            Entry::Occupied(_) => {
                tracing::debug!(guild_id = %guild_id, "Guild hydration already in flight");
                false
            }
            Entry::Vacant(slot) => {
                self.guilds.insert(guild_id, GuildHydration::Queued);
                let sequencer = Arc::clone(self);
                let task = tokio::spawn(async move {
                    sequencer
                        .run_guild(ctx, guild_id, chunk, subscribe, generation)
                        .await;
                });
                slot.insert(task.abort_handle());
                true
            }
        }
    }

    async fn run_guild(
        &self,
        ctx: Arc<StateContext>,
        guild_id: Snowflake,
        chunk: bool,
        subscribe: bool,
        generation: u64,
    ) {
        if chunk {
            self.guilds.insert(guild_id, GuildHydration::Chunking);
            let waited = match ctx.chunk_guild(guild_id).await {
                Ok(handle) => handle.wait(ctx.config.chunking.guild_timeout()).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match waited {
                Ok(()) => {}
                Err(StateError::ChunkTimeout { .. }) => {
                    StateError::HydrationTimeout(guild_id).log("GUILD_CREATE");
                }
                Err(e) => e.log("GUILD_CREATE"),
            }
        }

        if subscribe {
            self.guilds.insert(guild_id, GuildHydration::Subscribing);
            if let Err(e) = ctx.subscribe_guild(guild_id).await {
                e.log("GUILD_CREATE");
            }
        }

        let slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        self.in_flight.remove(&guild_id);
        self.guilds.insert(guild_id, GuildHydration::Settled);
        announce_guild(&ctx, guild_id);
    }
}

impl Default for ReadinessSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadinessSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessSequencer")
            .field("phase", &self.phase())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

/// Emit `guild_available` for a guild known from the baseline, otherwise
/// `guild_join`
pub(crate) fn announce_guild(ctx: &StateContext, guild_id: Snowflake) {
    let Some(guild) = ctx.store.get_guild(guild_id) else {
        return;
    };
    let event = match ctx.store.take_unavailable(guild_id) {
        Some(UnavailableKind::Existing) => ClientEvent::GuildAvailable(guild),
        Some(UnavailableKind::Joined) | None => ClientEvent::GuildJoin(guild),
    };
    ctx.events.emit(event);
}
