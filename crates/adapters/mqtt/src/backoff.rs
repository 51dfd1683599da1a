//! Exponential reconnection backoff.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Delay sequence `initial, initial * m, initial * m², …` capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: u32,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(config: &ReconnectConfig) -> Self {
        let initial = Duration::from_millis(config.initial_delay_ms);
        let max = Duration::from_secs(config.max_delay_secs).max(initial);
        Self {
            initial,
            max,
            multiplier: config.multiplier.max(1),
            current: initial,
        }
    }

    /// Delay to wait before the next attempt; grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .checked_mul(self.multiplier)
            .map_or(self.max, |next| next.min(self.max));
        delay
    }

    /// Start over after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
