//! Events crossing the broker boundary.
//!
//! [`InboundEvent`]s are device events received by the application client;
//! [`OutboundEvent`]s are published by the controller's own device client.

use crate::catalog::ActionCatalog;
use crate::time::{Timestamp, now};

/// Event name discovery responses are published under.
pub const RESPONSE_EVENT: &str = "response";

/// Payload format used for everything the controller publishes.
pub const JSON_FORMAT: &str = "json";

/// A device event as received from the broker. One per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub device_type: String,
    pub device_id: String,
    pub event_type: String,
    pub format: String,
    /// Raw payload; expected to hold JSON but not guaranteed to.
    pub payload: String,
    pub received_at: Timestamp,
}

impl InboundEvent {
    /// Create a JSON-format event stamped with the current time.
    #[must_use]
    pub fn new(
        device_type: impl Into<String>,
        device_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            device_type: device_type.into(),
            device_id: device_id.into(),
            event_type: event_type.into(),
            format: JSON_FORMAT.to_string(),
            payload: payload.into(),
            received_at: now(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

/// An event the controller publishes as a device.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub event_type: String,
    pub format: String,
    pub payload: serde_json::Value,
}

impl OutboundEvent {
    /// The answer to a discovery request: the whole catalog.
    #[must_use]
    pub fn discovery_response(catalog: &ActionCatalog) -> Self {
        Self {
            event_type: RESPONSE_EVENT.to_string(),
            format: JSON_FORMAT.to_string(),
            payload: catalog.discovery_payload(),
        }
    }
}
