//! Chunk coordinator - correlates member requests with their reply batches

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_core::{Member, Snowflake};
use std::sync::Arc;

use super::request::{ChunkHandle, ChunkRequest};
use crate::store::EntityStore;

/// Completed request as reported to subscribers
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub guild_id: Snowflake,
    pub nonce: String,
    pub members: Arc<[Member]>,
}

fn generate_nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

pub struct ChunkCoordinator {
    store: Arc<EntityStore>,
    requests: DashMap<String, Arc<ChunkRequest>>,
    /// Outstanding full-guild request per guild
    guild_requests: DashMap<Snowflake, String>,
}

impl ChunkCoordinator {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            requests: DashMap::new(),
            guild_requests: DashMap::new(),
        }
    }

    /// Register a request under a fresh nonce
    pub fn begin_request(&self, guild_id: Snowflake, cache: bool) -> ChunkHandle {
        self.register(guild_id, cache, false)
    }

    /// Full-guild request, shared while one is outstanding.
    ///
    /// The flag is true when a new request was registered and the caller must
    /// send it.
    pub fn begin_guild_request(&self, guild_id: Snowflake, cache: bool) -> (ChunkHandle, bool) {
        if let Some(nonce) = self.guild_requests.get(&guild_id).map(|e| e.value().clone()) {
            if let Some(request) = self.requests.get(&nonce).map(|e| Arc::clone(e.value())) {
                return (request.handle(), false);
            }
        }

        let handle = self.register(guild_id, cache, true);
        self.guild_requests
            .insert(guild_id, handle.nonce().to_string());
        (handle, true)
    }

    fn register(&self, guild_id: Snowflake, cache: bool, full_guild: bool) -> ChunkHandle {
        loop {
            let nonce = generate_nonce();
            if let Entry::Vacant(slot) = self.requests.entry(nonce.clone()) {
                let request = Arc::new(ChunkRequest::new(nonce.clone(), guild_id, cache, full_guild));
                let handle = request.handle();
                slot.insert(request);
                tracing::debug!(guild_id = %guild_id, nonce = %nonce, full_guild, "Registered chunk request");
                return handle;
            }
        }
    }

    /// Apply one reply batch.
    ///
    /// Returns the result when this batch completed its request. Batches for
    /// unknown, mismatched or completed requests are ignored.
    pub fn on_batch(
        &self,
        guild_id: Snowflake,
        nonce: &str,
        members: Vec<Member>,
        is_final: bool,
    ) -> Option<ChunkResult> {
        let request = self.requests.get(nonce).map(|e| Arc::clone(e.value()))?;
        if request.guild_id() != guild_id {
            tracing::debug!(guild_id = %guild_id, nonce, "Chunk batch for a different guild");
            return None;
        }

        if !request.append(&members) {
            return None;
        }

        let guild = self.store.get_guild(guild_id);
        if request.caches() {
            if let Some(guild) = &guild {
                let mut guild = guild.write();
                for member in members {
                    let richer = guild
                        .get_member(member.user_id)
                        .is_some_and(Member::is_complete);
                    if !richer {
                        guild.add_member(member);
                    }
                }
            }
        }

        if !is_final {
            return None;
        }

        let members = request.complete()?;
        self.deregister(nonce, guild_id);

        if request.caches() && request.is_full_guild() {
            if let Some(guild) = &guild {
                guild.write().chunked = true;
            }
        }

        tracing::debug!(guild_id = %guild_id, nonce, count = members.len(), "Chunk request complete");
        Some(ChunkResult {
            guild_id,
            nonce: nonce.to_string(),
            members,
        })
    }

    fn deregister(&self, nonce: &str, guild_id: Snowflake) {
        self.requests.remove(nonce);
        self.guild_requests
            .remove_if(&guild_id, |_, outstanding| outstanding == nonce);
    }

    /// Forget a request whose outbound command could not be sent
    pub fn abandon(&self, handle: &ChunkHandle) {
        self.deregister(handle.nonce(), handle.guild_id());
    }

    pub fn is_pending(&self, nonce: &str) -> bool {
        self.requests.contains_key(nonce)
    }

    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Drop every registration; waiters keep their handles until they time out
    pub fn clear(&self) {
        self.requests.clear();
        self.guild_requests.clear();
    }
}

impl std::fmt::Debug for ChunkCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCoordinator")
            .field("pending", &self.requests.len())
            .finish_non_exhaustive()
    }
}
