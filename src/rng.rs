//! Pseudo-random draws for questions and sequences.

use std::time::{SystemTime, UNIX_EPOCH};

/// A pseudorandom number generator (PRNG) for picking notes. Pass the same
/// number to [Rng::new_with_seed()] to get the same stream of questions back.
#[derive(Debug, Clone)]
pub struct Rng(oorandom::Rand64);

impl Default for Rng {
    fn default() -> Self {
        let seed = Self::generate_seed().unwrap_or_else(|e| {
            log::warn!("OS entropy unavailable ({}), seeding from the clock", e);
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        });
        Self::new_with_seed(seed)
    }
}

impl Rng {
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    pub fn generate_seed() -> Result<u128, getrandom::Error> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes)?;
        Ok(u128::from_be_bytes(bytes))
    }

    pub fn rand_range(&mut self, range: std::ops::Range<u64>) -> u64 {
        self.0.rand_range(range)
    }

    /// Uniform index into a collection of `len` items; `None` when it's empty
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rand_range(0..len as u64) as usize)
    }
}
