//! Engine error types

use relay_core::{DomainError, Snowflake};
use thiserror::Error;

use crate::outbound::OutboundError;

/// State engine error type.
///
/// Nothing here is fatal: each variant either drops the offending event or
/// leaves the cache partially hydrated until live events correct it.
#[derive(Debug, Error)]
pub enum StateError {
    /// Unknown reference or structurally invalid payload
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Payload did not match the expected shape
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A caller's wait for member chunks exceeded its deadline
    #[error("Timed out waiting for member chunks of guild {guild_id} (nonce {nonce})")]
    ChunkTimeout { guild_id: Snowflake, nonce: String },

    /// Startup hydration of a guild exceeded its deadline
    #[error("Hydration of guild {0} timed out")]
    HydrationTimeout(Snowflake),

    /// The outbound command layer refused a command
    #[error("Outbound command failed: {0}")]
    Outbound(#[from] OutboundError),

    /// Operation requires an established session
    #[error("Session is not connected")]
    NotConnected,

    /// Superseded by a resynchronization
    #[error("Operation cancelled")]
    Cancelled,
}

impl StateError {
    /// Always false; kept so callers can branch without matching variants
    pub fn is_fatal(&self) -> bool {
        false
    }

    /// Level this error is logged at; `None` means it is never surfaced
    pub fn log_level(&self) -> Option<tracing::Level> {
        match self {
            Self::Domain(e) if e.is_unknown_reference() => Some(tracing::Level::DEBUG),
            Self::Cancelled => None,
            _ => Some(tracing::Level::WARN),
        }
    }

    /// Stable error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Decode(_) => "DECODE_ERROR",
            Self::ChunkTimeout { .. } => "CHUNK_TIMEOUT",
            Self::HydrationTimeout(_) => "HYDRATION_TIMEOUT",
            Self::Outbound(_) => "OUTBOUND_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Log at the level matching this error's class
    pub fn log(&self, event_type: &str) {
        match self.log_level() {
            Some(tracing::Level::DEBUG) => tracing::debug!(
                event_type,
                code = self.code(),
                error = %self,
                "Discarding event"
            ),
            Some(_) => tracing::warn!(
                event_type,
                code = self.code(),
                error = %self,
                "Failed to apply event"
            ),
            None => {}
        }
    }
}

/// Engine result type
pub type StateResult<T> = Result<T, StateError>;
