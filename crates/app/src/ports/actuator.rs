//! Actuator port — drives a physical device with catalogued radio parameters.

use std::future::Future;

use homerelay_domain::catalog::ActionEntry;
use homerelay_domain::error::RelayError;

/// What a successful actuation left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActuationReport {
    /// Exit code of the transmitter, when it exited normally.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Sends one action to a device.
///
/// There is no acknowledgment channel from the device: success means the
/// transmitter ran and reported success, not that the device reacted.
pub trait Actuator {
    /// Transmit `entry`.
    fn actuate(
        &self,
        entry: &ActionEntry,
    ) -> impl Future<Output = Result<ActuationReport, RelayError>> + Send;
}

impl<T: Actuator + Send + Sync> Actuator for std::sync::Arc<T> {
    fn actuate(
        &self,
        entry: &ActionEntry,
    ) -> impl Future<Output = Result<ActuationReport, RelayError>> + Send {
        (**self).actuate(entry)
    }
}
