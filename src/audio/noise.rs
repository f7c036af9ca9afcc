//! Comfort-noise source: seeded xorshift32 with 12-bit output.

use crate::config::NOISE_SEED;

/// Deterministic pseudo-random sample generator.
///
/// Same seed, same sequence. A zero seed would lock xorshift at zero, so
/// it is replaced by the default seed.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    state: u32,
}

impl NoiseSource {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { NOISE_SEED } else { seed },
        }
    }

    /// Advance and return the raw 32-bit state.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Next sample in `[-2048, 2047]` (top 12 bits, re-centered).
    #[inline]
    pub fn next_sample(&mut self) -> i32 {
        ((self.next_u32() >> 20) & 0x0FFF) as i32 - 2048
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::new(NOISE_SEED)
    }
}
