//! Actuation policy — whether overlapping requests for one device may run
//! the transmitter at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// How concurrent actuations are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActuationPolicy {
    /// At most one actuation per device at a time; different devices still
    /// run in parallel.
    #[default]
    SerializePerDevice,
    /// Every actuation runs as soon as it is requested.
    Concurrent,
}

/// Lazily created async lock per device id.
#[derive(Debug, Clone, Default)]
pub struct DeviceLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl DeviceLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, device_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(device_id.to_string()).or_default())
    }

    /// Wait until no other holder has `device_id`, then hold it until the
    /// guard is dropped.
    pub async fn acquire(&self, device_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(device_id).lock_owned().await
    }

    /// Number of devices that have been locked at least once.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
