//! Application identity — the device type and id the controller answers to.

use crate::error::{RelayError, ValidationError};

/// The `(device type, device id)` pair discovery requests must come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub device_type: String,
    pub device_id: String,
}

impl AppIdentity {
    #[must_use]
    pub fn new(device_type: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            device_id: device_id.into(),
        }
    }

    /// Whether an event published by `device_type`/`device_id` comes from
    /// this identity.
    #[must_use]
    pub fn matches(&self, device_type: &str, device_id: &str) -> bool {
        self.device_type == device_type && self.device_id == device_id
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] when either part is empty.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.device_type.is_empty() || self.device_id.is_empty() {
            return Err(ValidationError::EmptyDeviceId.into());
        }
        Ok(())
    }
}
