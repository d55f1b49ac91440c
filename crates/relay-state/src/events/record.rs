//! Decoded dispatch record as delivered by the transport

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GatewayEventType;

/// One dispatch record: an event name and its opaque payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRecord {
    /// Event name
    pub t: String,
    /// Event payload
    #[serde(default)]
    pub d: Value,
}

impl GatewayRecord {
    pub fn new(t: impl Into<String>, d: Value) -> Self {
        Self { t: t.into(), d }
    }

    /// Build a record for a known event type
    pub fn of(event: GatewayEventType, d: Value) -> Self {
        Self::new(event.as_str(), d)
    }

    /// Known event type, if the engine has a handler for it
    pub fn event_type(&self) -> Option<GatewayEventType> {
        self.t.parse().ok()
    }
}
