//! Seeded environment for deterministic simulation.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use bolt_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall clock used when none is given: 2024-01-01T00:00:00Z.
pub const DEFAULT_EPOCH_MS: u64 = 1_704_067_200_000;

/// Simulation environment.
///
/// The clock only moves when [`SimEnv::advance`] is called and randomness
/// comes from a seeded ChaCha stream, so two runs with the same seed produce
/// identical correlation ids and timestamps. Clones share state.
#[derive(Clone)]
pub struct SimEnv {
    clock_ms: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment with seed 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock_ms: Arc::new(AtomicU64::new(DEFAULT_EPOCH_MS)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the wall clock forward.
    pub fn advance(&self, ms: u64) {
        self.clock_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the wall clock, possibly backwards.
    pub fn set_clock(&self, ms: u64) {
        self.clock_ms.store(ms, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    fn wall_clock_ms(&self) -> u64 {
        self.clock_ms.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
