//! Sampling report drivers (`vmpage`, `ondisk-size`) and their text/JSON
//! presentation. The analyses return structured results; everything printed
//! is produced here.

use std::io::Write;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, OutputFormat};
use crate::errors::StatError;
use crate::histogram::{build_histogram, Histogram, HistogramRow};
use crate::pagesize::{recommend_page_size, PageSizeReport, SimulationConfig};
use crate::random::RandomSource;
use crate::sampler::{SampleStats, Sampler};
use crate::store::KeyStore;

#[derive(Debug, Serialize)]
struct VmpageOutput<'a> {
    stats: &'a SampleStats,
    simulation: &'a PageSizeReport,
}

#[derive(Debug, Serialize)]
struct OndiskSizeOutput<'a> {
    stats: &'a SampleStats,
    histogram: &'a Histogram,
    rows: &'a [HistogramRow],
}

// ────────────────────────────────────────────────────────────────────────────
// Drivers
// ────────────────────────────────────────────────────────────────────────────

/// Samples the dataset and recommends a vm-page-size.
///
/// The simulation is CPU-bound and runs inside `spawn_blocking`, awaited
/// before anything else happens.
pub async fn vmpage<S, W>(
    store: &S,
    config: &Config,
    simulation: SimulationConfig,
    mut rng: Box<dyn RandomSource>,
    out: &mut W,
) -> Result<(), StatError>
where
    S: KeyStore + ?Sized,
    W: Write,
{
    let samples = Sampler::new(config.sample_size, config.max_discards)
        .collect(store)
        .await?;
    let stats = samples.stats();

    if config.format == OutputFormat::Text {
        write_stats(out, &stats)?;
        writeln!(out, "Simulate fragmentation with different page sizes...")?;
        out.flush()?;
    }

    let report = tokio::task::spawn_blocking(move || {
        recommend_page_size(&samples, &simulation, rng.as_mut())
    })
    .await
    .map_err(|e| {
        StatError::Internal(anyhow::anyhow!("spawn_blocking failed in vmpage simulation: {e}"))
    })??;

    info!(best_page_size = report.best_page_size, "Page size simulation complete");

    match config.format {
        OutputFormat::Text => write_page_size_report(out, &report)?,
        OutputFormat::Json => write_json(
            out,
            &VmpageOutput {
                stats: &stats,
                simulation: &report,
            },
        )?,
    }
    Ok(())
}

/// Samples the dataset and graphs the distribution of serialized lengths.
pub async fn ondisk_size<S, W>(store: &S, config: &Config, out: &mut W) -> Result<(), StatError>
where
    S: KeyStore + ?Sized,
    W: Write,
{
    let samples = Sampler::new(config.sample_size, config.max_discards)
        .collect(store)
        .await?;
    let stats = samples.stats();
    let histogram = build_histogram(&samples, config.scale());

    let rows = match histogram.rows() {
        Ok(rows) => rows,
        Err(StatError::NoData) => {
            warn!("Histogram has no data to display");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    match config.format {
        OutputFormat::Text => {
            write_stats(out, &stats)?;
            write_histogram(out, &rows)?;
        }
        OutputFormat::Json => write_json(
            out,
            &OndiskSizeOutput {
                stats: &stats,
                histogram: &histogram,
                rows: &rows,
            },
        )?,
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Text presentation
// ────────────────────────────────────────────────────────────────────────────

pub fn write_stats<W: Write>(out: &mut W, stats: &SampleStats) -> Result<(), StatError> {
    writeln!(out, "Sampled {} keys from DB 0", stats.count)?;
    writeln!(out, "  Average: {:.2}", stats.mean)?;
    writeln!(out, "  Standard deviation: {:.2}", stats.std_dev)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_page_size_report<W: Write>(
    out: &mut W,
    report: &PageSizeReport,
) -> Result<(), StatError> {
    for c in &report.candidates {
        writeln!(
            out,
            "{}: bytes per page: {:.2}, space efficiency: {:.2}%",
            c.page_size, c.density, c.space_efficiency
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "The best compromise between bytes per page and swap file size: {}",
        report.best_page_size
    )?;
    Ok(())
}

/// Histogram rows as `label |bar (pct%)`; an empty slice prints the
/// no-data notice instead.
pub fn write_histogram<W: Write>(out: &mut W, rows: &[HistogramRow]) -> Result<(), StatError> {
    if rows.is_empty() {
        writeln!(out, "{}", StatError::NoData)?;
        return Ok(());
    }
    for row in rows {
        writeln!(
            out,
            "{:<13} |{} ({:.2}%)",
            row.label,
            "-".repeat(row.bar_len),
            row.percent
        )?;
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), StatError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| StatError::Internal(anyhow::anyhow!("failed to encode report: {e}")))?;
    writeln!(out)?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
