// ============================================
// File: crates/wakelink-core/src/crypto/random.rs
// ============================================
//! # Random Byte Sources
//!
//! ## Creation Reason
//! Nonces and generated tokens come from an injected source so tests can
//! replay exact byte streams.
//!
//! ## Main Functionality
//! - `RandomSource`: Trait the channel draws nonces from
//! - `OsRandom`: Operating system CSPRNG (production)
//! - `SeededRandom`: Deterministic generator (tests and tooling)
//!
//! ## ⚠️ Important Note for Next Developer
//! - `SeededRandom` is predictable; never wire it into the daemon
//!
//! ## Last Modified
//! v0.1.0 - Initial random sources

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Source of random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Reproducible generator seeded from a `u64`.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Creates a generator from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}
