//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness). Tests
//! run against virtual time and a seeded RNG; production uses the system
//! clock and OS entropy.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

/// Longest delay any timer is armed with. Longer ones are clamped, since
/// adding an unbounded duration to an instant can overflow.
pub const MAX_TIMER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Monotonic instant usable by the state machines.
///
/// Implemented by `std::time::Instant` and `tokio::time::Instant`.
pub trait MonotonicInstant:
    Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = Self>
{
    /// Time remaining until `deadline`, zero if it has passed.
    fn until(self, deadline: Self) -> Duration {
        if deadline > self { deadline - self } else { Duration::ZERO }
    }

    /// Deadline `delay` from now, with `delay` clamped to [`MAX_TIMER`].
    #[must_use]
    fn after(self, delay: Duration) -> Self {
        self + delay.min(MAX_TIMER)
    }
}

impl<T> MonotonicInstant for T where
    T: Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = T>
{
}

/// Time and randomness seen by the transport and chat layers.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated environment produces the same sequence
///   of random bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    type Instant: MonotonicInstant;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleep for `duration`.
    ///
    /// Only drivers await this; the sans-IO machines take `now` as an
    /// argument instead.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Wall clock in Unix milliseconds, used for wire timestamps.
    fn wall_clock_millis(&self) -> u64;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates 16 random bytes, enough for a v4 UUID.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn until_saturates_at_zero() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(250);

        assert_eq!(t0.until(t1), Duration::from_millis(250));
        assert_eq!(t1.until(t0), Duration::ZERO);
        assert_eq!(t1.until(t1), Duration::ZERO);
    }

    #[test]
    fn oversized_delays_are_clamped() {
        let t0 = Instant::now();

        assert_eq!(t0.after(Duration::from_millis(250)), t0 + Duration::from_millis(250));
        assert_eq!(t0.after(Duration::MAX), t0 + MAX_TIMER);
        assert_eq!(t0.until(t0.after(Duration::from_millis(u64::MAX))), MAX_TIMER);
    }
}
