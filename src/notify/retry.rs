//! Exponential backoff with jitter for channel delivery retries.
//!
//! Delays grow as `initial * multiplier^attempt`, capped at a maximum.
//! Each sleep is jittered so channels retrying the same outage do not
//! hammer the endpoint in lockstep. The un-jittered schedule is pure
//! and tested directly; jitter only ever shortens a delay.

use std::time::Duration;

use rand::Rng;

/// Retry schedule for one channel's delivery.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_backoff: Duration,

    /// Cap on the exponential growth.
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl RetryConfig {
    /// Default schedule: 3 retries at 0.5s, 1s, 2s (before jitter).
    pub const DEFAULT: RetryConfig = RetryConfig {
        max_retries: 3,
        initial_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_secs(8),
        multiplier: 2.0,
    };

    /// Builds the schedule from the server configuration.
    pub fn from_config(config: &crate::config::Config) -> RetryConfig {
        RetryConfig {
            max_retries: config.delivery_max_retries,
            initial_backoff: config.delivery_initial_backoff,
            max_backoff: config.delivery_max_backoff,
            multiplier: 2.0,
        }
    }

    /// The un-jittered delay before retry `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }

    /// The jittered delay actually slept: uniform in [delay/2, delay].
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        let factor: f64 = rand::rng().random_range(0.5..=1.0);
        delay.mul_f64(factor)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::DEFAULT
    }
}
