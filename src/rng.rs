//! Random number generator shared by board generation and exploration.
//!
//! Uses the `rand` crate with `SmallRng` (xoshiro256++) which is fast and
//! works with WASM. Entropy is sourced from `getrandom` (OS or browser crypto API).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A seedable RNG wrapper.
///
/// Can be seeded for deterministic replay, or created from system entropy.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: SmallRng,
}

impl GameRng {
    /// Create from system entropy.
    pub fn new() -> Self {
        Self {
            inner: SmallRng::from_os_rng(),
        }
    }

    /// Create with a specific seed for deterministic behavior.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seeded RNG for an independent stream derived from `seed`.
    ///
    /// Stream 0 is `from_seed(seed)`; other streams never share its sequence.
    pub fn from_seed_stream(seed: u64, stream: u64) -> Self {
        Self::from_seed(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Generate a random usize in [0, max).
    #[inline(always)]
    pub fn gen_range(&mut self, max: usize) -> usize {
        self.inner.random_range(0..max)
    }

    /// Pick a uniformly random element, `None` when `items` is empty.
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.gen_range(items.len())])
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new()
    }
}
