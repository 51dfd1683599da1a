//! Topic layout of the `IoT` platform.
//!
//! | Direction | Topic |
//! |-----------|-------|
//! | device events seen by an application | `iot-2/type/{type}/id/{id}/evt/{event}/fmt/{format}` |
//! | events published by a device | `iot-2/evt/{event}/fmt/{format}` |

use crate::error::MqttError;

/// The parts of an application-side device event topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEventTopic<'a> {
    pub device_type: &'a str,
    pub device_id: &'a str,
    pub event_type: &'a str,
    pub format: &'a str,
}

impl<'a> DeviceEventTopic<'a> {
    /// Split a device event topic into its parts.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidTopic`] when `topic` does not follow the
    /// device event layout or has an empty segment.
    pub fn parse(topic: &'a str) -> Result<Self, MqttError> {
        let invalid = || MqttError::InvalidTopic(topic.to_string());
        let segments: Vec<&str> = topic.split('/').collect();

        match segments.as_slice() {
            ["iot-2", "type", device_type, "id", device_id, "evt", event_type, "fmt", format]
                if [device_type, device_id, event_type, format]
                    .iter()
                    .all(|segment| !segment.is_empty()) =>
            {
                Ok(Self {
                    device_type: *device_type,
                    device_id: *device_id,
                    event_type: *event_type,
                    format: *format,
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Filter matching every event of every device of `device_type`.
#[must_use]
pub fn device_events_filter(device_type: &str) -> String {
    format!("iot-2/type/{device_type}/id/+/evt/+/fmt/+")
}

/// Topic a device publishes `event_type` on.
#[must_use]
pub fn device_publish_topic(event_type: &str, format: &str) -> String {
    format!("iot-2/evt/{event_type}/fmt/{format}")
}
