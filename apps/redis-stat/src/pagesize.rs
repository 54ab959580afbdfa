//! Page-Size Simulator — guesses the best vm-page-size for a sampled dataset.
//!
//! The swap file is modelled as a fixed number of pages, since the server
//! spends one bit of RAM per page whatever the page size. For every candidate
//! size (8, 16, ... 65536 bytes) a fresh bitmap is filled with objects drawn
//! at random from the samples, each placed at a random offset (random
//! first-fit). A draw gets `PLACEMENT_ATTEMPTS` tries; when all of them fail
//! the bitmap counts as saturated and the trial ends.
//!
//! Scoring: `density = stored_bytes / pages` and
//! `space_efficiency = stored_bytes * 100 / (pages * page_size)`; the page size
//! with the highest `density * space_efficiency` wins.

use serde::Serialize;
use tracing::info;

use crate::errors::StatError;
use crate::random::RandomSource;
use crate::sampler::SampleSet;

pub const DEFAULT_TOTAL_PAGES: usize = 1_000_000;
pub const MIN_PAGE_SIZE: u64 = 8;
pub const MAX_PAGE_SIZE: u64 = 64 * 1024;
pub const PLACEMENT_ATTEMPTS: usize = 200;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Pages in the simulated swap file (constant across candidates).
    pub total_pages: usize,
    pub min_page_size: u64,
    pub max_page_size: u64,
    pub placement_attempts: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_pages: DEFAULT_TOTAL_PAGES,
            min_page_size: MIN_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            placement_attempts: PLACEMENT_ATTEMPTS,
        }
    }
}

impl SimulationConfig {
    /// Candidate page sizes: doubling from `min_page_size` up to and
    /// including `max_page_size`.
    pub fn candidates(&self) -> impl Iterator<Item = u64> {
        let max = self.max_page_size;
        std::iter::successors(Some(self.min_page_size.max(1)), |p| p.checked_mul(2))
            .take_while(move |&p| p <= max)
    }
}

/// Outcome of one candidate page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationResult {
    pub page_size: u64,
    pub stored_bytes: u64,
    pub used_pages: usize,
    /// Payload bytes per page slot.
    pub density: f64,
    /// Percentage of the addressable bytes holding payload.
    pub space_efficiency: f64,
    pub score: f64,
}

/// All candidates plus the winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSizeReport {
    pub total_pages: usize,
    pub candidates: Vec<SimulationResult>,
    pub best_page_size: u64,
}

/// Occupancy of the simulated swap file. One per trial, never reused.
#[derive(Debug)]
pub(crate) struct PageBitmap {
    pages: Vec<bool>,
}

impl PageBitmap {
    pub(crate) fn new(total_pages: usize) -> Self {
        Self {
            pages: vec![false; total_pages],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn is_free(&self, offset: usize, count: usize) -> bool {
        self.pages[offset..offset + count].iter().all(|&used| !used)
    }

    pub(crate) fn occupy(&mut self, offset: usize, count: usize) {
        self.pages[offset..offset + count].fill(true);
    }

    pub(crate) fn occupied(&self) -> usize {
        self.pages.iter().filter(|&&used| used).count()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulation
// ────────────────────────────────────────────────────────────────────────────

/// Runs the simulation for every candidate page size and picks the best.
///
/// The first candidate always becomes the initial best; later ones replace it
/// only with a strictly higher score.
pub fn recommend_page_size(
    samples: &SampleSet,
    config: &SimulationConfig,
    rng: &mut dyn RandomSource,
) -> Result<PageSizeReport, StatError> {
    if samples.is_empty() || config.total_pages == 0 {
        return Err(StatError::NoData);
    }

    let mut candidates = Vec::new();
    for page_size in config.candidates() {
        let result = simulate_page_size(samples, page_size, config, rng);
        info!(
            page_size,
            stored_bytes = result.stored_bytes,
            used_pages = result.used_pages,
            score = result.score,
            "Page size trial finished"
        );
        candidates.push(result);
    }

    let mut best: Option<&SimulationResult> = None;
    for result in &candidates {
        if best.map_or(true, |b| b.score < result.score) {
            best = Some(result);
        }
    }
    let best_page_size = best.map(|b| b.page_size).ok_or(StatError::NoData)?;

    Ok(PageSizeReport {
        total_pages: config.total_pages,
        candidates,
        best_page_size,
    })
}

/// One trial: fills a fresh bitmap with random draws until a draw can't be
/// placed within `placement_attempts` tries.
pub fn simulate_page_size(
    samples: &SampleSet,
    page_size: u64,
    config: &SimulationConfig,
    rng: &mut dyn RandomSource,
) -> SimulationResult {
    let mut bitmap = PageBitmap::new(config.total_pages);
    let total_pages = bitmap.len();
    let mut stored_bytes = 0u64;
    let mut used_pages = 0usize;

    while let Some(bytes_needed) = samples.draw(rng) {
        let pages_needed = pages_for(bytes_needed, page_size);

        // Too big to ever fit: the bitmap is saturated for this object.
        if pages_needed > total_pages {
            break;
        }

        let positions = total_pages - (pages_needed - 1);
        let placed = (0..config.placement_attempts).find_map(|_| {
            let offset = rng.next_below(positions);
            bitmap.is_free(offset, pages_needed).then_some(offset)
        });

        match placed {
            Some(offset) => {
                bitmap.occupy(offset, pages_needed);
                used_pages += pages_needed;
                stored_bytes += bytes_needed;
            }
            None => break,
        }
    }

    debug_assert_eq!(bitmap.occupied(), used_pages);
    score_trial(page_size, total_pages, stored_bytes, used_pages)
}

/// Pages occupied by an object. Zero-length objects still take one page.
fn pages_for(bytes: u64, page_size: u64) -> usize {
    bytes.div_ceil(page_size).max(1) as usize
}

fn score_trial(
    page_size: u64,
    total_pages: usize,
    stored_bytes: u64,
    used_pages: usize,
) -> SimulationResult {
    let stored = stored_bytes as f64;
    let pages = total_pages as f64;
    let density = stored / pages;
    let space_efficiency = stored * 100.0 / (pages * page_size as f64);

    SimulationResult {
        page_size,
        stored_bytes,
        used_pages,
        density,
        space_efficiency,
        score: density * space_efficiency,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedSource};

    fn small_config(total_pages: usize) -> SimulationConfig {
        SimulationConfig {
            total_pages,
            ..SimulationConfig::default()
        }
    }

    // ── candidates ──────────────────────────────────────────────────────────

    #[test]
    fn test_default_candidates_double_from_8_to_65536() {
        let sizes: Vec<u64> = SimulationConfig::default().candidates().collect();
        assert_eq!(sizes.len(), 14);
        assert_eq!(sizes.first(), Some(&8));
        assert_eq!(sizes.last(), Some(&65536));
        assert!(sizes.windows(2).all(|w| w[1] == w[0] * 2));
    }

    #[test]
    fn test_pages_for_rounds_up() {
        assert_eq!(pages_for(1, 8), 1);
        assert_eq!(pages_for(8, 8), 1);
        assert_eq!(pages_for(9, 8), 2);
        assert_eq!(pages_for(24, 8), 3);
        assert_eq!(pages_for(0, 8), 1);
    }

    // ── PageBitmap ──────────────────────────────────────────────────────────

    #[test]
    fn test_bitmap_occupy_and_check() {
        let mut bitmap = PageBitmap::new(10);
        assert!(bitmap.is_free(0, 10));
        bitmap.occupy(3, 3);
        assert_eq!(bitmap.occupied(), 3);
        assert!(!bitmap.is_free(2, 2));
        assert!(bitmap.is_free(6, 4));
        assert!(bitmap.is_free(0, 3));
    }

    // ── simulate_page_size ──────────────────────────────────────────────────

    #[test]
    fn test_three_page_objects_saturate_ten_pages() {
        // Every draw needs 3 pages of 8 bytes. Offsets 0, 3 and 6 leave only
        // page 9 free, so the fourth draw burns all 200 attempts.
        let samples = SampleSet::from_vec(vec![24]);
        let config = small_config(10);
        let mut rng = ScriptedSource::new(&[0, 0, 0, 3, 0, 6]);

        let result = simulate_page_size(&samples, 8, &config, &mut rng);
        assert_eq!(result.used_pages, 9);
        assert_eq!(result.stored_bytes, 72);
        assert!((result.density - 7.2).abs() < 1e-9);
        assert!((result.space_efficiency - 90.0).abs() < 1e-9);
    }

    /// First draw lands at offset 0; the second collides `collisions` times
    /// at offset 1 before trying the free offset 3.
    fn second_placement_after(collisions: usize) -> SimulationResult {
        let mut script = vec![0, 0, 0];
        script.extend(std::iter::repeat(1).take(collisions));
        script.push(3);

        let samples = SampleSet::from_vec(vec![24]);
        let mut rng = ScriptedSource::new(&script);
        simulate_page_size(&samples, 8, &small_config(10), &mut rng)
    }

    #[test]
    fn test_placement_succeeds_on_last_attempt() {
        let result = second_placement_after(PLACEMENT_ATTEMPTS - 1);
        assert_eq!(result.used_pages, 6);
        assert_eq!(result.stored_bytes, 48);
    }

    #[test]
    fn test_no_placement_attempt_past_the_cap() {
        let result = second_placement_after(PLACEMENT_ATTEMPTS);
        assert_eq!(result.used_pages, 3);
        assert_eq!(result.stored_bytes, 24);
    }

    #[test]
    fn test_object_larger_than_bitmap_stores_nothing() {
        let samples = SampleSet::from_vec(vec![1000]);
        let config = small_config(10);
        let mut rng = ScriptedSource::new(&[]);

        let result = simulate_page_size(&samples, 8, &config, &mut rng);
        assert_eq!(result.used_pages, 0);
        assert_eq!(result.stored_bytes, 0);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_single_page_objects_store_one_sample_per_page() {
        let samples = SampleSet::from_vec(vec![5]);
        let config = small_config(16);
        let mut rng = RngSource::seeded(3);

        let result = simulate_page_size(&samples, 8, &config, &mut rng);
        assert!(result.used_pages <= 16);
        assert_eq!(result.stored_bytes, 5 * result.used_pages as u64);
    }

    #[test]
    fn test_invariants_hold_for_every_candidate() {
        let samples = SampleSet::from_vec(vec![12, 100, 350, 900, 4000, 17, 64, 2048]);
        let config = small_config(5_000);
        let mut rng = RngSource::seeded(11);

        let report = recommend_page_size(&samples, &config, &mut rng).unwrap();
        assert_eq!(report.candidates.len(), 14);
        for c in &report.candidates {
            assert!(c.used_pages <= config.total_pages, "{c:?}");
            assert!(c.stored_bytes <= c.used_pages as u64 * c.page_size, "{c:?}");
            assert!(c.space_efficiency <= 100.0, "{c:?}");
        }
    }

    // ── recommend_page_size ─────────────────────────────────────────────────

    #[test]
    fn test_best_page_size_has_highest_score() {
        let samples = SampleSet::from_vec(vec![30, 60, 120, 250, 500]);
        let config = small_config(20_000);
        let mut rng = RngSource::seeded(5);

        let report = recommend_page_size(&samples, &config, &mut rng).unwrap();
        let max_score = report
            .candidates
            .iter()
            .map(|c| c.score)
            .fold(f64::MIN, f64::max);
        let winner = report
            .candidates
            .iter()
            .find(|c| c.page_size == report.best_page_size)
            .unwrap();
        assert_eq!(winner.score, max_score);
    }

    #[test]
    fn test_ties_keep_the_first_candidate() {
        // Nothing fits anywhere, so every score is 0 and the first size wins.
        let samples = SampleSet::from_vec(vec![10_000_000]);
        let config = small_config(4);
        let mut rng = ScriptedSource::new(&[]);

        let report = recommend_page_size(&samples, &config, &mut rng).unwrap();
        assert_eq!(report.best_page_size, 8);
    }

    #[test]
    fn test_each_finished_candidate_is_logged() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let samples = SampleSet::from_vec(vec![100]);
        let mut rng = RngSource::seeded(2);
        tracing::subscriber::with_default(subscriber, || {
            recommend_page_size(&samples, &small_config(64), &mut rng).unwrap();
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("Page size trial finished").count(), 14, "{logs}");
        assert!(logs.contains("page_size=8 "), "{logs}");
        assert!(logs.contains("page_size=65536 "), "{logs}");
    }

    #[test]
    fn test_empty_samples_is_no_data() {
        let samples = SampleSet::from_vec(vec![]);
        let mut rng = ScriptedSource::new(&[]);
        let err = recommend_page_size(&samples, &small_config(10), &mut rng).unwrap_err();
        assert!(matches!(err, StatError::NoData));
    }
}
