//! # homerelay-adapter-transmitter
//!
//! Drives 433MHz devices by running an external transmitter program
//! (for example `codesend` from 433Utils) once per action:
//!
//! ```text
//! <program> <encoding> <delay>
//! ```
//!
//! The encoding and delay are passed as separate arguments, never through a
//! shell. Output is captured and logged; a non-zero exit, a signal, a spawn
//! failure or a timeout is reported as an actuation failure.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `homerelay-app` and `homerelay-domain`.

mod config;
mod error;

pub use config::TransmitterConfig;
pub use error::TransmitterError;

use std::process::Stdio;

use tokio::process::Command;

use homerelay_app::ports::{ActuationReport, Actuator};
use homerelay_domain::catalog::ActionEntry;
use homerelay_domain::error::RelayError;

/// [`Actuator`] backed by a child process.
#[derive(Debug, Clone)]
pub struct TransmitterActuator {
    config: TransmitterConfig,
}

impl TransmitterActuator {
    #[must_use]
    pub fn new(config: TransmitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TransmitterConfig {
        &self.config
    }

    /// The command line run for `entry`, for logging.
    #[must_use]
    pub fn command_line(&self, entry: &ActionEntry) -> String {
        format!(
            "{} {} {}",
            self.config.program.display(),
            entry.encoding,
            entry.delay
        )
    }

    #[tracing::instrument(skip_all, fields(action = %entry.action))]
    async fn transmit(&self, entry: &ActionEntry) -> Result<ActuationReport, TransmitterError> {
        let mut command = Command::new(&self.config.program);
        command
            .arg(&entry.encoding)
            .arg(entry.delay.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(command = %self.command_line(entry), "sending command to device");

        let running = command.output();
        let result = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, running)
                .await
                .map_err(|_| TransmitterError::TimedOut(limit))?,
            None => running.await,
        };
        let output = result.map_err(|source| TransmitterError::Spawn {
            program: self.config.program.display().to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        tracing::info!(stdout = %stdout, stderr = %stderr, "transmitter output");

        if output.status.success() {
            return Ok(ActuationReport {
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }
        Err(match output.status.code() {
            Some(code) => TransmitterError::Failed { code, stderr },
            None => TransmitterError::Killed { stderr },
        })
    }
}

impl Actuator for TransmitterActuator {
    async fn actuate(&self, entry: &ActionEntry) -> Result<ActuationReport, RelayError> {
        self.transmit(entry)
            .await
            .map_err(TransmitterError::into_domain)
    }
}
