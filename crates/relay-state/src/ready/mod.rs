//! Session readiness and guild hydration

mod phase;
mod sequencer;

pub use phase::{GuildHydration, SessionPhase};
pub(crate) use sequencer::announce_guild;
pub use sequencer::ReadinessSequencer;
