//! # relay-state
//!
//! Client-side state synchronization engine: ingests dispatch records in
//! delivery order, mirrors remote state in an in-memory entity store, runs
//! member chunking and per-guild hydration, and emits semantic events.

pub mod chunk;
pub mod context;
mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod mappers;
pub mod outbound;
pub mod ready;
pub mod store;

// Re-export commonly used types at crate root
pub use chunk::{ChunkCoordinator, ChunkHandle, ChunkResult};
pub use context::{MemberQuery, StateContext};
pub use dispatch::EventDispatcher;
pub use engine::StateEngine;
pub use error::{StateError, StateResult};
pub use events::{ClientEvent, EventEmitter, GatewayEventType, GatewayRecord};
pub use outbound::{GatewayCommands, MemberRequest, OutboundError};
pub use ready::{GuildHydration, ReadinessSequencer, SessionPhase};
pub use store::{CachedChannel, EntityStore, UnavailableKind};
