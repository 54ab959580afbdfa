//! Sampler — draws object sizes from the store into a `SampleSet`.
//!
//! Each draw is two round trips: RANDOMKEY, then the key's serialized length.
//! Draws whose length is zero or unobtainable are discarded and retried
//! without counting toward the target; the number of discards is bounded so a
//! pathological store can't keep the sampler spinning forever.

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::StatError;
use crate::random::RandomSource;
use crate::store::KeyStore;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Observed byte lengths, in collection order. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    samples: Vec<u64>,
}

/// Summary statistics of a `SampleSet`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by `count`, not `count - 1`).
    pub std_dev: f64,
}

impl SampleSet {
    pub fn from_vec(samples: Vec<u64>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.samples
    }

    /// One sample chosen uniformly at random, with replacement.
    /// `None` on an empty set.
    pub fn draw(&self, rng: &mut dyn RandomSource) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples[rng.next_below(self.samples.len())])
    }

    /// Mean and population standard deviation. All zeros on an empty set.
    pub fn stats(&self) -> SampleStats {
        let count = self.samples.len();
        if count == 0 {
            return SampleStats {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
            };
        }

        let n = count as f64;
        let mean = self.samples.iter().map(|&s| s as f64).sum::<f64>() / n;
        let variance = self
            .samples
            .iter()
            .map(|&s| {
                let delta = s as f64 - mean;
                delta * delta
            })
            .sum::<f64>()
            / n;

        SampleStats {
            count,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sampler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    sample_size: usize,
    max_discards: usize,
}

impl Sampler {
    pub fn new(sample_size: usize, max_discards: usize) -> Self {
        Self {
            sample_size,
            max_discards,
        }
    }

    /// Collects exactly `sample_size` non-zero lengths.
    ///
    /// Fails with `EmptyDataset` if the store has no keys, `Store` on any
    /// transport or protocol error, and `SamplingExhausted` once more than
    /// `max_discards` draws have been thrown away.
    pub async fn collect<S: KeyStore + ?Sized>(&self, store: &S) -> Result<SampleSet, StatError> {
        info!("Sampling {} random keys from DB 0...", self.sample_size);

        let mut samples = Vec::with_capacity(self.sample_size);
        let mut discarded = 0usize;

        while samples.len() < self.sample_size {
            let key = store.random_key().await?.ok_or(StatError::EmptyDataset)?;

            match store.serialized_length(&key).await? {
                Some(len) if len > 0 => samples.push(len),
                other => {
                    discarded += 1;
                    debug!(
                        key = %String::from_utf8_lossy(&key),
                        length = ?other,
                        "Discarding sample draw"
                    );
                    if discarded > self.max_discards {
                        return Err(StatError::SamplingExhausted {
                            collected: samples.len(),
                            discarded,
                        });
                    }
                }
            }
        }

        info!(collected = samples.len(), discarded, "Sampling complete");
        Ok(SampleSet::from_vec(samples))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
