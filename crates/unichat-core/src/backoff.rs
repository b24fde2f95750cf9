//! Reconnect backoff policy.
//!
//! Attempt `n` (1-based) waits `min(base_delay * 2^(n-1), max_delay)`. Once
//! `n` would exceed `max_attempts` the transport gives up.

use std::time::Duration;

/// Delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any single reconnect delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Reconnect attempts made before reporting `connection-failed`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Exponential backoff with a delay cap and an attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before attempt 1
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Highest attempt number that is still scheduled
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl BackoffPolicy {
    /// Delay before attempt `attempt` (1-based). Attempt 0 is treated as 1.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;

        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether attempt `attempt` is within the ceiling.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}
