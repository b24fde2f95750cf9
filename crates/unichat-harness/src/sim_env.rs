//! Simulated environment.
//!
//! Time comes from `tokio::time`, so tests run on `start_paused = true`
//! runtimes and advance the clock explicitly. Randomness comes from a seeded
//! `ChaCha8Rng`, so message ids repeat across runs with the same seed.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::Instant;
use unichat_core::Environment;

/// Wall clock at simulation start: 2024-01-01T00:00:00Z.
pub const DEFAULT_WALL_BASE_MILLIS: u64 = 1_704_067_200_000;

/// Deterministic environment for simulation.
///
/// Clones share the RNG, so every component draws from one sequence.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    start: Instant,
    wall_base: u64,
}

impl SimEnv {
    /// Environment with the RNG seeded from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            start: Instant::now(),
            wall_base: DEFAULT_WALL_BASE_MILLIS,
        }
    }

    /// Virtual time since this environment was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Instant::now() - self.start
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn wall_clock_millis(&self) -> u64 {
        self.wall_base + self.elapsed().as_millis() as u64
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
