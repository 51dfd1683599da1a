//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`RelayError`]
//! via `#[from]` or an adapter-specific `into_domain()`.

use std::error::Error;

/// Boxed source error carried across port boundaries.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Top-level error for the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A domain invariant was violated (usually while loading the catalog).
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested device or action is not in the catalog.
    #[error("action lookup failed")]
    LookupMiss(#[from] LookupMiss),

    /// A JSON document was well-formed but lacked a required field.
    #[error("malformed request")]
    Shape(#[from] ShapeError),

    /// A JSON document could not be parsed.
    #[error("invalid JSON")]
    Parse(#[from] serde_json::Error),

    /// The transmitter program could not be run or reported failure.
    #[error("actuation failed")]
    Actuation(#[source] BoxError),

    /// The message broker connection failed.
    #[error("transport error")]
    Transport(#[source] BoxError),
}

/// Catalog invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("controller id must not be empty")]
    EmptyControllerId,

    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("device {device_id} has an action with an empty name")]
    EmptyActionName { device_id: String },

    #[error("device id {0} appears more than once")]
    DuplicateDeviceId(String),

    #[error("action {action} appears more than once on device {device_id}")]
    DuplicateAction { device_id: String, action: String },
}

/// Why a `(device id, action)` pair could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupMiss {
    #[error("unknown device {device_id}")]
    UnknownDevice { device_id: String },

    #[error("device {device_id} has no action {action}")]
    UnknownAction { device_id: String, action: String },
}

/// A required field was missing from an inbound payload, or had the wrong type,
/// or the message arrived on a topic that carries no device event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("field {0} is not a string")]
    NotAString(&'static str),

    #[error("unexpected topic {0}")]
    UnexpectedTopic(String),
}
