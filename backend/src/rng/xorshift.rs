//! xorshift64* random number generator
//!
//! Fast, high-quality PRNG, deterministic and suitable for simulation.
//! Same seed → same sequence. This is CRITICAL for:
//! - Debugging (reproduce an exact run)
//! - Testing (verify behavior)
//! - Research (validate results)
//!
//! On top of the raw generator this module carries the sampling helpers the
//! agent and trend models need: uniform float ranges, probability draws,
//! weighted choice and subset sampling.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use social_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let p = rng.next_f64();           // [0.0, 1.0)
/// let cost = rng.range_f64(0.5, 2.0); // [0.5, 2.0)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with the given seed.
    ///
    /// A zero seed is coerced to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate the next random u64, advancing the internal state.
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Random i64 in `[min, max)`.
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");
        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Random f64 in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Random f64 in `[min, max)`.
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        assert!(min < max, "min must be less than max");
        min + self.next_f64() * (max - min)
    }

    /// Bernoulli draw: true with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_f64() < p
    }

    /// Weighted choice: index into `weights` with probability proportional
    /// to its weight. Non-positive weights are never selected. Returns
    /// `None` when no weight is positive.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = self.next_f64() * total;
        let mut last_positive = None;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            last_positive = Some(i);
            target -= w;
            if target <= 0.0 {
                return Some(i);
            }
        }
        // Float rounding can leave a sliver of target; fall back to the
        // last positive-weight candidate.
        last_positive
    }

    /// Sample `k` distinct indices out of `[0, n)` via partial Fisher-Yates.
    ///
    /// Returns all `n` indices (shuffled) when `k >= n`.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let take = k.min(n);
        for i in 0..take {
            let j = i + self.range(0, (n - i) as i64) as usize;
            pool.swap(i, j);
        }
        pool.truncate(take);
        pool
    }

    /// Current state, for checkpointing/replay.
    pub fn state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.state(), 0, "zero seed should be coerced to 1");
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!((0.0..1.0).contains(&val), "value {val} outside [0, 1)");
        }
    }

    #[test]
    fn test_range_f64_in_bounds() {
        let mut rng = RngManager::new(777);
        for _ in 0..1000 {
            let val = rng.range_f64(0.5, 2.5);
            assert!((0.5..2.5).contains(&val), "value {val} outside [0.5, 2.5)");
        }
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = RngManager::new(1);
        assert!(!rng.chance(0.0));
        assert!(!rng.chance(-1.0));
        assert!(rng.chance(1.0));
        assert!(rng.chance(2.0));
    }

    #[test]
    fn test_pick_weighted_skips_zero_weights() {
        let mut rng = RngManager::new(42);
        for _ in 0..200 {
            let idx = rng.pick_weighted(&[0.0, 1.0, 0.0]).unwrap();
            assert_eq!(idx, 1);
        }
    }

    #[test]
    fn test_pick_weighted_none_when_all_nonpositive() {
        let mut rng = RngManager::new(42);
        assert_eq!(rng.pick_weighted(&[0.0, -1.0]), None);
        assert_eq!(rng.pick_weighted(&[]), None);
    }

    #[test]
    fn test_sample_indices_distinct() {
        let mut rng = RngManager::new(99);
        let sample = rng.sample_indices(50, 10);
        assert_eq!(sample.len(), 10);
        let mut sorted = sample.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 10, "sampled indices must be distinct");
    }

    #[test]
    fn test_sample_indices_k_exceeds_n() {
        let mut rng = RngManager::new(99);
        let sample = rng.sample_indices(5, 20);
        assert_eq!(sample.len(), 5);
    }

    #[test]
    fn test_determinism() {
        let mut rng1 = RngManager::new(99999);
        let mut rng2 = RngManager::new(99999);
        for _ in 0..100 {
            assert_eq!(rng1.next(), rng2.next());
        }
    }
}
