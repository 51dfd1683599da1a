//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp stamped on inbound events when they are received.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
