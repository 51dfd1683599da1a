//! Transmitter configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the external transmitter program.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransmitterConfig {
    /// Program invoked as `<program> <encoding> <delay>`.
    pub program: PathBuf,
    /// Kill the program after this many seconds. Unset means wait forever.
    pub timeout_secs: Option<u64>,
    /// Run at most one transmission per device at a time.
    pub serialize_per_device: bool,
}

impl TransmitterConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("codesend"),
            timeout_secs: None,
            serialize_per_device: true,
        }
    }
}
