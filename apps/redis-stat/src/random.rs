//! Pluggable random source for the sampling analyses.
//!
//! The page-size simulator only ever needs "a uniform integer below `bound`",
//! so that is the whole capability. Production runs wrap a `StdRng`; tests
//! inject `ScriptedSource` to force exact placement sequences.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send {
    /// Returns a uniform integer in `0..bound`. `bound` is always > 0.
    fn next_below(&mut self, bound: usize) -> usize;
}

/// `RandomSource` backed by any `rand` generator.
pub struct RngSource<R> {
    rng: R,
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn next_below(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }
}

/// Replays a fixed list of values (reduced modulo the requested bound),
/// then yields 0 forever.
#[cfg(test)]
pub struct ScriptedSource {
    values: std::collections::VecDeque<usize>,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(values: &[usize]) -> Self {
        Self {
            values: values.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedSource {
    fn next_below(&mut self, bound: usize) -> usize {
        self.values.pop_front().map(|v| v % bound).unwrap_or(0)
    }
}
