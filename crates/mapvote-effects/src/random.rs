//! Random effect handler
//!
//! This is the handler layer, where actual system randomness is provided.

use mapvote_core::RandomEffects;
use rand::Rng;

/// Random handler backed by the thread-local RNG
#[derive(Debug, Clone, Default)]
pub struct RealRandomHandler;

impl RealRandomHandler {
    /// Create a new real random handler
    pub fn new() -> Self {
        Self
    }
}

impl RandomEffects for RealRandomHandler {
    fn random_index(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_within_bound() {
        let random = RealRandomHandler::new();
        for bound in 1..50 {
            assert!(random.random_index(bound) < bound);
        }
    }
}
