//! Transmitter adapter error types.

use std::time::Duration;

use homerelay_domain::error::RelayError;

/// Errors raised while running the transmitter program.
#[derive(Debug, thiserror::Error)]
pub enum TransmitterError {
    /// The program could not be started.
    #[error("failed to start transmitter {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited with a non-zero status.
    #[error("transmitter exited with status {code}")]
    Failed { code: i32, stderr: String },

    /// The program was terminated by a signal.
    #[error("transmitter was terminated by a signal")]
    Killed { stderr: String },

    /// The program did not finish within the configured timeout.
    #[error("transmitter timed out after {0:?}")]
    TimedOut(Duration),
}

impl TransmitterError {
    /// Convert into a [`RelayError::Actuation`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> RelayError {
        RelayError::Actuation(Box::new(self))
    }
}

impl From<TransmitterError> for RelayError {
    fn from(err: TransmitterError) -> Self {
        err.into_domain()
    }
}
