//! A single outstanding member request

use parking_lot::Mutex;
use relay_core::{Member, Snowflake};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{StateError, StateResult};

type Callback = Box<dyn FnOnce(&[Member]) + Send>;

struct Progress {
    buffer: Vec<Member>,
    callbacks: Vec<Callback>,
    completed: bool,
}

/// Member request correlated with its reply batches by nonce.
///
/// Completes at most once; the final buffer is published to every waiter.
pub struct ChunkRequest {
    nonce: String,
    guild_id: Snowflake,
    /// Merge batch members into the guild cache
    cache: bool,
    /// Full-guild request; completion marks the guild chunked
    full_guild: bool,
    progress: Mutex<Progress>,
    result: watch::Sender<Option<Arc<[Member]>>>,
}

impl ChunkRequest {
    pub(crate) fn new(nonce: String, guild_id: Snowflake, cache: bool, full_guild: bool) -> Self {
        let (result, _) = watch::channel(None);
        Self {
            nonce,
            guild_id,
            cache,
            full_guild,
            progress: Mutex::new(Progress {
                buffer: Vec::new(),
                callbacks: Vec::new(),
                completed: false,
            }),
            result,
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn guild_id(&self) -> Snowflake {
        self.guild_id
    }

    pub fn caches(&self) -> bool {
        self.cache
    }

    pub fn is_full_guild(&self) -> bool {
        self.full_guild
    }

    pub fn is_complete(&self) -> bool {
        self.progress.lock().completed
    }

    /// Buffer a batch; false once the request has completed
    pub(crate) fn append(&self, members: &[Member]) -> bool {
        let mut progress = self.progress.lock();
        if progress.completed {
            return false;
        }
        progress.buffer.extend_from_slice(members);
        true
    }

    /// Complete with the accumulated buffer; `None` if already complete
    pub(crate) fn complete(&self) -> Option<Arc<[Member]>> {
        let (members, callbacks) = {
            let mut progress = self.progress.lock();
            if progress.completed {
                return None;
            }
            progress.completed = true;
            let members: Arc<[Member]> = std::mem::take(&mut progress.buffer).into();
            self.result.send_replace(Some(Arc::clone(&members)));
            (members, std::mem::take(&mut progress.callbacks))
        };

        for callback in callbacks {
            callback(&members);
        }
        Some(members)
    }

    /// Run `callback` on completion, immediately if already complete
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&[Member]) + Send + 'static,
    {
        let mut progress = self.progress.lock();
        if !progress.completed {
            progress.callbacks.push(Box::new(callback));
            return;
        }
        drop(progress);

        let members = self.result.borrow().clone().unwrap_or_else(|| Arc::from(Vec::new()));
        callback(&members);
    }

    pub(crate) fn handle(self: &Arc<Self>) -> ChunkHandle {
        ChunkHandle {
            request: Arc::clone(self),
            rx: self.result.subscribe(),
        }
    }
}

impl std::fmt::Debug for ChunkRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRequest")
            .field("nonce", &self.nonce)
            .field("guild_id", &self.guild_id)
            .field("cache", &self.cache)
            .field("complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}

/// Caller-side handle to a request: blocking wait or completion callback
#[derive(Debug, Clone)]
pub struct ChunkHandle {
    request: Arc<ChunkRequest>,
    rx: watch::Receiver<Option<Arc<[Member]>>>,
}

impl ChunkHandle {
    pub fn nonce(&self) -> &str {
        self.request.nonce()
    }

    pub fn guild_id(&self) -> Snowflake {
        self.request.guild_id()
    }

    pub fn is_complete(&self) -> bool {
        self.request.is_complete()
    }

    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&[Member]) + Send + 'static,
    {
        self.request.on_complete(callback);
    }

    /// Wait for completion.
    ///
    /// A timeout only abandons this wait; the request stays registered and a
    /// late reply is still applied.
    pub async fn wait(&self, timeout: Duration) -> StateResult<Arc<[Member]>> {
        let mut rx = self.rx.clone();
        let outcome = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(result)) => result.clone().ok_or(StateError::Cancelled),
            Ok(Err(_)) => Err(StateError::Cancelled),
            Err(_) => Err(StateError::ChunkTimeout {
                guild_id: self.guild_id(),
                nonce: self.nonce().to_string(),
            }),
        };
        outcome
    }
}
