//! Wire records, typed payloads and the semantic events derived from them

mod client_event;
mod event_types;
pub mod payloads;
mod record;

pub use client_event::{ClientEvent, EventEmitter};
pub use event_types::{GatewayEventType, UnknownEventType};
pub use record::GatewayRecord;
