//! Seeded randomness

use mapvote_core::RandomEffects;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reproducible [`RandomEffects`] backed by ChaCha8.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<ChaCha8Rng>,
}

impl SeededRandom {
    /// Generator seeded with `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl RandomEffects for SeededRandom {
    fn random_index(&self, bound: usize) -> usize {
        self.rng.lock().gen_range(0..bound)
    }
}
