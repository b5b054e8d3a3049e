//! Bounded exponential reconnect backoff.
//!
//! Delays follow `base * 2^attempt`, capped at `max_delay`, for at most
//! `max_attempts` attempts. Delays carry no jitter.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Reconnect attempt counter.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    attempts: u32,
}

impl Backoff {
    /// Create a fresh schedule.
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempts: 0 }
    }

    /// Delay before the next attempt, counting it as made.
    ///
    /// `None` when reconnecting is disabled or the attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.config.enabled || self.attempts >= self.config.max_attempts {
            return None;
        }

        let factor = 1u32.checked_shl(self.attempts).unwrap_or(u32::MAX);
        let delay = self.config.base_delay.saturating_mul(factor).min(self.config.max_delay);
        self.attempts += 1;
        Some(delay)
    }

    /// Attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start over after a successful join.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
