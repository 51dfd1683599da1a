//! Action catalog — the static registry of radio-controlled devices.
//!
//! Each [`DeviceEntry`] lists the named actions it supports, and each
//! [`ActionEntry`] carries the parameters handed to the transmitter program
//! (an opaque `encoding` and a `delay`).
//!
//! The catalog is read from and published as the same JSON document:
//!
//! ```json
//! { "d": { "deviceId": "Controller-1", "deviceResponse": "discovery",
//!          "devices": [ { "deviceId": "Outlet-1", "description": "433MHz RF Outlet",
//!                         "actions": [ { "action": "on", "description": "Turns the outlet on",
//!                                        "encoding": "1381717", "delay": 189 } ] } ] } }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LookupMiss, RelayError, ValidationError};

/// Value of `d.deviceResponse` in a published catalog.
pub const DISCOVERY_RESPONSE: &str = "discovery";

/// A single named action and its transmission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub action: String,
    #[serde(default)]
    pub description: String,
    /// Code sent over the air. Opaque to the relay; numbers are accepted and
    /// kept as their decimal text.
    #[serde(deserialize_with = "opaque_string")]
    pub encoding: String,
    /// Pulse delay passed to the transmitter.
    pub delay: u32,
}

/// A device and the actions it understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    pub device_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
}

impl DeviceEntry {
    /// First action named `action`, if any.
    #[must_use]
    pub fn find_action(&self, action: &str) -> Option<&ActionEntry> {
        self.actions.iter().find(|entry| entry.action == action)
    }
}

/// Immutable registry of devices, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "CatalogDocument")]
pub struct ActionCatalog {
    controller_id: String,
    devices: Vec<DeviceEntry>,
}

impl ActionCatalog {
    /// Build a catalog, enforcing id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] when the controller id, a device id
    /// or an action name is empty, or when a device id (or an action name
    /// within one device) is repeated.
    pub fn new(
        controller_id: impl Into<String>,
        devices: Vec<DeviceEntry>,
    ) -> Result<Self, RelayError> {
        let catalog = Self {
            controller_id: controller_id.into(),
            devices,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Parse`] for malformed JSON and
    /// [`RelayError::Validation`] when the document breaks an invariant.
    pub fn from_json_str(json: &str) -> Result<Self, RelayError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::new(document.d.device_id, document.d.devices)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.controller_id.is_empty() {
            return Err(ValidationError::EmptyControllerId);
        }
        let mut seen_devices = HashSet::new();
        for device in &self.devices {
            if device.device_id.is_empty() {
                return Err(ValidationError::EmptyDeviceId);
            }
            if !seen_devices.insert(device.device_id.as_str()) {
                return Err(ValidationError::DuplicateDeviceId(device.device_id.clone()));
            }
            let mut seen_actions = HashSet::new();
            for entry in &device.actions {
                if entry.action.is_empty() {
                    return Err(ValidationError::EmptyActionName {
                        device_id: device.device_id.clone(),
                    });
                }
                if !seen_actions.insert(entry.action.as_str()) {
                    return Err(ValidationError::DuplicateAction {
                        device_id: device.device_id.clone(),
                        action: entry.action.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Identifier the controller announces itself with in discovery responses.
    #[must_use]
    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    #[must_use]
    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    /// Total number of actions across all devices.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.devices.iter().map(|device| device.actions.len()).sum()
    }

    /// Look up the transmission parameters for `action` on `device_id`.
    ///
    /// Devices are scanned in catalog order, then that device's actions; the
    /// first exact match wins.
    ///
    /// # Errors
    ///
    /// Returns [`LookupMiss::UnknownDevice`] when no device has `device_id`
    /// and [`LookupMiss::UnknownAction`] when the device exists but lacks
    /// `action`.
    pub fn resolve(&self, device_id: &str, action: &str) -> Result<&ActionEntry, LookupMiss> {
        let device = self
            .devices
            .iter()
            .find(|device| device.device_id == device_id)
            .ok_or_else(|| LookupMiss::UnknownDevice {
                device_id: device_id.to_string(),
            })?;

        device
            .find_action(action)
            .ok_or_else(|| LookupMiss::UnknownAction {
                device_id: device_id.to_string(),
                action: action.to_string(),
            })
    }

    /// The catalog as the JSON document published in discovery responses.
    #[must_use]
    pub fn discovery_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "d": {
                "deviceId": self.controller_id,
                "deviceResponse": DISCOVERY_RESPONSE,
                "devices": self.devices,
            }
        })
    }
}

/// Wire form of the catalog.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    d: CatalogBody,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogBody {
    device_id: String,
    #[serde(default = "default_device_response")]
    device_response: String,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

fn default_device_response() -> String {
    DISCOVERY_RESPONSE.to_string()
}

impl From<ActionCatalog> for CatalogDocument {
    fn from(catalog: ActionCatalog) -> Self {
        Self {
            d: CatalogBody {
                device_id: catalog.controller_id,
                device_response: default_device_response(),
                devices: catalog.devices,
            },
        }
    }
}

fn opaque_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    })
}
