//! Seeded pseudo-random stream
//!
//! Every synthesized value is drawn from a [`SeededRng`], a 64-bit linear
//! congruential generator with no hidden entropy source. Two instances built
//! from the same seed yield the same stream on every platform.
//!
//! Fields draw from the stream in declaration order, so reordering the fields
//! of a schema changes the values of every field after the first moved one.

use sha2::{Digest, Sha256};

/// LCG multiplier (Knuth, MMIX)
const LCG_A: u64 = 6364136223846793005;

/// LCG increment (Knuth, MMIX)
const LCG_C: u64 = 1442695040888963407;

/// 2^53, the number of distinct doubles in [0, 1) with full mantissa precision
const F64_SCALE: f64 = (1u64 << 53) as f64;

/// Deterministic random number generator
///
/// `state = state * A + C (mod 2^64)`; outputs use the top 53 bits of the
/// new state so that every float is strictly below 1.0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a generator whose stream is fully determined by `seed`
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Create the generator used for the record at `index`
    pub fn for_record(seed: u64, index: u64) -> Self {
        Self::new(record_seed(seed, index))
    }

    /// Advance the state and return the raw 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        self.state = lcg_next(self.state);
        self.state
    }

    /// Next float in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / F64_SCALE
    }

    /// Next float in [min, max]; returns `min` when the bounds are equal
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Uniform index in [0, len). `len` must be non-zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len - 1)
    }

    /// True with the given probability
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

fn lcg_next(state: u64) -> u64 {
    state.wrapping_mul(LCG_A).wrapping_add(LCG_C)
}

/// Seed for the record at `index` of a stream seeded with `seed`
///
/// Composition: the first eight bytes (little-endian) of
/// `SHA-256("RECORD_SEED" || len || seed_be || index_be)`. A record's values
/// never depend on whether earlier records were generated.
pub fn record_seed(seed: u64, index: u64) -> u64 {
    const DOMAIN: &str = "RECORD_SEED";

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN.as_bytes());
    hasher.update([DOMAIN.len() as u8]);
    hasher.update(seed.to_be_bytes());
    hasher.update(index.to_be_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut rng1 = SeededRng::new(42);
        let mut rng2 = SeededRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_f64(), rng2.next_f64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut rng1 = SeededRng::new(1);
        let mut rng2 = SeededRng::new(2);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_floats_in_unit_interval() {
        let mut rng = SeededRng::new(7);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_next_index_bounds() {
        let mut rng = SeededRng::new(99);
        let mut seen = [false; 3];
        for _ in 0..1_000 {
            let idx = rng.next_index(3);
            assert!(idx < 3);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_next_range_degenerate() {
        let mut rng = SeededRng::new(5);
        assert_eq!(rng.next_range(3.5, 3.5), 3.5);
    }

    #[test]
    fn test_record_seed_is_stable_and_position_keyed() {
        assert_eq!(record_seed(42, 10), record_seed(42, 10));
        assert_ne!(record_seed(42, 10), record_seed(42, 11));
        assert_ne!(record_seed(42, 10), record_seed(43, 10));
        // seed + index collisions must not alias
        assert_ne!(record_seed(42, 1), record_seed(43, 0));
    }

    #[test]
    fn test_for_record_independent_of_history() {
        let mut direct = SeededRng::for_record(42, 5);
        let expected = direct.next_f64();

        // Drawing other records first has no effect on record 5
        for i in 0..5 {
            let mut other = SeededRng::for_record(42, i);
            other.next_f64();
        }
        let mut again = SeededRng::for_record(42, 5);
        assert_eq!(again.next_f64(), expected);
    }
}
