//! Nonce-correlated member chunking

mod coordinator;
mod request;

pub use coordinator::{ChunkCoordinator, ChunkResult};
pub use request::{ChunkHandle, ChunkRequest};
