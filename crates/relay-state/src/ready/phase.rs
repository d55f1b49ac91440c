//! Session and per-guild hydration states

use std::fmt;

/// Session-level readiness.
///
/// `Connecting -> AwaitingBaseline -> Hydrating -> Ready`; a new baseline
/// returns to `AwaitingBaseline` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    #[default]
    Connecting,
    /// READY received, waiting for its supplemental half
    AwaitingBaseline,
    /// Baseline materialized, startup chunking and subscriptions running
    Hydrating,
    Ready,
}

impl SessionPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::AwaitingBaseline => "awaiting_baseline",
            Self::Hydrating => "hydrating",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-guild hydration progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuildHydration {
    Queued,
    Chunking,
    Subscribing,
    Settled,
}
