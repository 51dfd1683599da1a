//! Request classification — deciding what an inbound event asks for.
//!
//! Requests are carried as `{"d": {"deviceRequest": {"deviceId": …, "action": …}}}`.
//! An action of `"discovery"` sent by the controller's own application
//! identity asks for the catalog; any other complete request names a device
//! action to perform.

use serde_json::Value;

use crate::error::{RelayError, ShapeError};
use crate::event::InboundEvent;
use crate::identity::AppIdentity;

/// Action name that turns a request into a discovery request.
pub const DISCOVERY_ACTION: &str = "discovery";

/// The `(device id, action)` pair extracted from a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub device_id: String,
    pub action: String,
}

impl ParsedRequest {
    /// Extract `d.deviceRequest.{deviceId,action}` from a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedReason::Parse`] if the payload is not JSON and
    /// [`UnrecognizedReason::Shape`] naming the first missing or non-string
    /// field.
    pub fn from_payload(payload: &str) -> Result<Self, UnrecognizedReason> {
        let json: Value = serde_json::from_str(payload).map_err(UnrecognizedReason::Parse)?;
        Self::from_value(&json).map_err(UnrecognizedReason::Shape)
    }

    fn from_value(json: &Value) -> Result<Self, ShapeError> {
        let request = json
            .get("d")
            .ok_or(ShapeError::MissingField("d"))?
            .get("deviceRequest")
            .ok_or(ShapeError::MissingField("d.deviceRequest"))?;

        Ok(Self {
            device_id: string_field(request, "deviceId", "d.deviceRequest.deviceId")?,
            action: string_field(request, "action", "d.deviceRequest.action")?,
        })
    }
}

fn string_field(object: &Value, key: &str, path: &'static str) -> Result<String, ShapeError> {
    match object.get(key) {
        None => Err(ShapeError::MissingField(path)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ShapeError::NotAString(path)),
    }
}

/// What an inbound event asks the controller to do.
#[derive(Debug)]
pub enum Classification {
    /// Publish the catalog.
    Discovery,
    /// Perform an action on a device.
    ActionRequest(ParsedRequest),
    /// Nothing the controller understands.
    Unrecognized(UnrecognizedReason),
}

/// Why an event was not recognised.
#[derive(Debug, thiserror::Error)]
pub enum UnrecognizedReason {
    #[error("payload is not valid JSON")]
    Parse(#[source] serde_json::Error),

    #[error("payload has an unexpected shape")]
    Shape(#[source] ShapeError),
}

impl From<UnrecognizedReason> for RelayError {
    fn from(reason: UnrecognizedReason) -> Self {
        match reason {
            UnrecognizedReason::Parse(err) => Self::Parse(err),
            UnrecognizedReason::Shape(err) => Self::Shape(err),
        }
    }
}

/// Classify `event` for a controller running as `identity`.
///
/// A discovery request must come from `identity` (event device type and id),
/// address `identity.device_id` in its body and carry the action
/// [`DISCOVERY_ACTION`]. Every other complete request is an action request,
/// including a `"discovery"` action sent by some other device.
#[must_use]
pub fn classify(event: &InboundEvent, identity: &AppIdentity) -> Classification {
    let request = match ParsedRequest::from_payload(&event.payload) {
        Ok(request) => request,
        Err(reason) => return Classification::Unrecognized(reason),
    };

    let is_discovery = identity.matches(&event.device_type, &event.device_id)
        && request.device_id == identity.device_id
        && request.action == DISCOVERY_ACTION;

    if is_discovery {
        Classification::Discovery
    } else {
        Classification::ActionRequest(request)
    }
}
