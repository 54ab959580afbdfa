use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};

use crate::histogram::ScaleKind;

/// The kind of output to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatKind {
    /// Print general information about a Redis instance.
    Overview,
    /// Print information about Redis VM activity.
    Vmstat,
    /// Try to guess the best vm-page-size for your dataset.
    Vmpage,
    /// Stats and graphs about values len once stored on disk.
    #[value(name = "ondisk-size")]
    OndiskSize,
    /// Measure Redis server latency.
    Latency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Command-line arguments. Connection settings fall back to `REDIS_STAT_*`
/// environment variables (a `.env` file is honoured).
#[derive(Debug, Parser)]
#[command(
    name = "redis-stat",
    version = env!("CARGO_PKG_VERSION"),
    about = "Statistics and sampling reports for a Redis instance"
)]
pub struct Args {
    /// Statistic type
    #[arg(value_enum, default_value = "overview")]
    pub stat: StatKind,

    /// Server hostname
    #[arg(long, env = "REDIS_STAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(long, env = "REDIS_STAT_PORT", default_value_t = 6379)]
    pub port: u16,

    /// Server password
    #[arg(long, env = "REDIS_STAT_AUTH")]
    pub auth: Option<String>,

    /// Delay between requests in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub delay: u64,

    /// Number of keys to sample for 'vmpage' and 'ondisk-size'
    #[arg(long, default_value_t = 10_000)]
    pub samplesize: usize,

    /// Discarded draws tolerated while sampling (default: 10 x samplesize)
    #[arg(long)]
    pub max_discards: Option<usize>,

    /// Use power-of-two logarithmic scale in graphs
    #[arg(long)]
    pub logscale: bool,

    /// Seed for the simulation random source
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format for the sampling reports
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Immutable run configuration, built once and passed into each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub stat: StatKind,
    pub host: String,
    pub port: u16,
    pub auth: Option<String>,
    pub delay_ms: u64,
    pub sample_size: usize,
    pub max_discards: usize,
    pub logscale: bool,
    pub seed: Option<u64>,
    pub format: OutputFormat,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        if args.samplesize == 0 {
            bail!("samplesize must be greater than zero");
        }
        let max_discards = args
            .max_discards
            .unwrap_or_else(|| args.samplesize.saturating_mul(10));

        Ok(Config {
            stat: args.stat,
            host: args.host,
            port: args.port,
            auth: args.auth,
            delay_ms: args.delay,
            sample_size: args.samplesize,
            max_discards,
            logscale: args.logscale,
            seed: args.seed,
            format: args.format,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    pub fn scale(&self) -> ScaleKind {
        if self.logscale {
            ScaleKind::PowerOfTwo
        } else {
            ScaleKind::LinearAuto
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Config> {
        let args = Args::try_parse_from(argv)?;
        Config::from_args(args)
    }

    #[test]
    fn test_defaults_to_overview() {
        let config = parse(&["redis-stat"]).unwrap();
        assert_eq!(config.stat, StatKind::Overview);
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.sample_size, 10_000);
        assert_eq!(config.max_discards, 100_000);
        assert!(!config.logscale);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn test_ondisk_size_with_logscale() {
        let config =
            parse(&["redis-stat", "ondisk-size", "--logscale", "--samplesize", "500"]).unwrap();
        assert_eq!(config.stat, StatKind::OndiskSize);
        assert_eq!(config.sample_size, 500);
        assert_eq!(config.max_discards, 5000);
        assert_eq!(config.scale(), ScaleKind::PowerOfTwo);
    }

    #[test]
    fn test_linear_scale_without_logscale() {
        let config = parse(&["redis-stat", "ondisk-size"]).unwrap();
        assert_eq!(config.scale(), ScaleKind::LinearAuto);
    }

    #[test]
    fn test_zero_samplesize_rejected() {
        let err = parse(&["redis-stat", "vmpage", "--samplesize", "0"]).unwrap_err();
        assert!(err.to_string().contains("samplesize"), "{err}");
    }

    #[test]
    fn test_unknown_stat_rejected() {
        assert!(Args::try_parse_from(["redis-stat", "bogus"]).is_err());
    }

    #[test]
    fn test_redis_url_from_host_and_port() {
        let config = parse(&["redis-stat", "--port", "7000"]).unwrap();
        assert_eq!(config.port, 7000);
        assert!(config.redis_url().ends_with(":7000/"));
    }

    #[test]
    fn test_explicit_max_discards() {
        let config =
            parse(&["redis-stat", "vmpage", "--max-discards", "7", "--seed", "9"]).unwrap();
        assert_eq!(config.max_discards, 7);
        assert_eq!(config.seed, Some(9));
    }
}
