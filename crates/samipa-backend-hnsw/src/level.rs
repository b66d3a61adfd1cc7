//! Probabilistic insertion-level assignment.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Samples insertion levels from an exponential distribution with rate
/// `lambda = 1 / ln(degree_parameter)`.
///
/// The random source is owned and seeded explicitly, so two samplers built
/// with the same seed produce identical level sequences.
pub struct LevelSampler {
    lambda: f64,
    cap: Option<usize>,
    rng: StdRng,
}

impl LevelSampler {
    /// `degree_parameter` must be at least 2 (enforced by config validation;
    /// `ln(1) = 0` would make the rate undefined).
    pub fn new(degree_parameter: usize, seed: u64, cap: Option<usize>) -> Self {
        Self {
            lambda: 1.0 / (degree_parameter as f64).ln(),
            cap,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw the next level: `floor(-ln(u) / lambda)` with `u` uniform in
    /// `(0, 1]`. Without a configured cap the result is unbounded, and
    /// callers must tolerate arbitrarily tall, sparse levels.
    pub fn sample(&mut self) -> usize {
        // gen() is [0, 1); flipping to (0, 1] keeps ln(u) finite.
        let u: f64 = 1.0 - self.rng.gen::<f64>();
        let level = (-u.ln() / self.lambda).floor() as usize;
        match self.cap {
            Some(cap) => level.min(cap),
            None => level,
        }
    }
}
