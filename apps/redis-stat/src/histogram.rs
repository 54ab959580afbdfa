//! Histogram Builder — buckets sampled sizes into 20 ranges for an ASCII graph.
//!
//! Two scale families:
//! - power-of-two: bucket `i` holds values up to `2^i`
//! - linear: bucket `i` holds values up to `(i + 1) * step`, where the step
//!   is picked from the samples (1, escalating to 5, then 50)
//!
//! The last bucket also takes every value above `threshold[18]`.

use serde::Serialize;

use crate::errors::StatError;
use crate::sampler::SampleSet;

pub const GRAPH_ROWS: usize = 20;
pub const GRAPH_BAR_LEN: usize = 50;

const LINEAR_STEPS: [u64; 3] = [1, 5, 50];

// ────────────────────────────────────────────────────────────────────────────
// Scale selection
// ────────────────────────────────────────────────────────────────────────────

/// Scale requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    PowerOfTwo,
    LinearAuto,
}

/// Scale actually used for bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    PowerOfTwo,
    Linear { step: u64 },
}

impl Scale {
    /// Resolves `LinearAuto` against the samples. The step only ever
    /// escalates: 1 while everything fits in `20 * 1`, 5 once a sample
    /// exceeds that, 50 once a sample exceeds `20 * 5`. 50 is the ceiling.
    pub fn select(kind: ScaleKind, samples: &[u64]) -> Self {
        match kind {
            ScaleKind::PowerOfTwo => Scale::PowerOfTwo,
            ScaleKind::LinearAuto => {
                let mut level = 0;
                for &sample in samples {
                    while level + 1 < LINEAR_STEPS.len()
                        && sample > LINEAR_STEPS[level] * GRAPH_ROWS as u64
                    {
                        level += 1;
                    }
                    if level + 1 == LINEAR_STEPS.len() {
                        break;
                    }
                }
                Scale::Linear {
                    step: LINEAR_STEPS[level],
                }
            }
        }
    }
}

/// Ascending bucket upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleTable {
    thresholds: [u64; GRAPH_ROWS],
}

impl ScaleTable {
    pub fn new(scale: Scale) -> Self {
        let mut thresholds = [0u64; GRAPH_ROWS];
        for (i, t) in thresholds.iter_mut().enumerate() {
            *t = match scale {
                Scale::PowerOfTwo => 1u64 << i,
                Scale::Linear { step } => (i as u64 + 1) * step,
            };
        }
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &[u64; GRAPH_ROWS] {
        &self.thresholds
    }

    /// Smallest `i` with `threshold[i] >= value`; anything above
    /// `threshold[GRAPH_ROWS - 2]` lands in the overflow bucket.
    pub fn bucket_index(&self, value: u64) -> usize {
        self.thresholds[..GRAPH_ROWS - 1]
            .iter()
            .position(|&t| t >= value)
            .unwrap_or(GRAPH_ROWS - 1)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Histogram
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub scale: Scale,
    pub table: ScaleTable,
    /// Samples per bucket; sums to `total`.
    pub frequencies: [usize; GRAPH_ROWS],
    pub total: usize,
}

/// One printable line of the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramRow {
    pub label: String,
    pub bar_len: usize,
    pub percent: f64,
}

pub fn build_histogram(samples: &SampleSet, kind: ScaleKind) -> Histogram {
    let scale = Scale::select(kind, samples.as_slice());
    let table = ScaleTable::new(scale);

    let mut frequencies = [0usize; GRAPH_ROWS];
    for &sample in samples.as_slice() {
        frequencies[table.bucket_index(sample)] += 1;
    }

    Histogram {
        scale,
        table,
        frequencies,
        total: samples.len(),
    }
}

impl Histogram {
    /// Highest bucket holding at least one sample.
    pub fn highest_bucket(&self) -> Option<usize> {
        self.frequencies.iter().rposition(|&f| f > 0)
    }

    /// Rows up to the highest non-empty bucket, bars scaled so the fullest
    /// retained bucket is `GRAPH_BAR_LEN` long.
    pub fn rows(&self) -> Result<Vec<HistogramRow>, StatError> {
        let high = self.highest_bucket().ok_or(StatError::NoData)?;
        let retained = &self.frequencies[..=high];
        let max = retained.iter().copied().max().unwrap_or(0);
        if max == 0 || self.total == 0 {
            return Err(StatError::NoData);
        }

        let thresholds = self.table.thresholds();
        let rows = retained
            .iter()
            .enumerate()
            .map(|(j, &freq)| {
                let label = if j == high && j > 0 {
                    format!(">  {}", thresholds[j - 1])
                } else {
                    format!("<= {}", thresholds[j])
                };
                HistogramRow {
                    label,
                    bar_len: freq * GRAPH_BAR_LEN / max,
                    percent: freq as f64 * 100.0 / self.total as f64,
                }
            })
            .collect();

        Ok(rows)
    }
}
