mod config;
mod errors;
mod histogram;
mod monitor;
mod pagesize;
mod random;
mod report;
mod sampler;
mod store;

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StatKind};
use crate::errors::StatError;
use crate::pagesize::SimulationConfig;
use crate::random::RngSource;
use crate::store::RedisStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Configuration errors are reported before anything connects.
    let config = Config::from_env()?;

    // Diagnostics go to stderr; stdout is reserved for the report.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("redis_stat={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting redis-stat v{}", env!("CARGO_PKG_VERSION"));

    let store = RedisStore::connect(&config.redis_url(), config.auth.as_deref()).await?;
    let delay = Duration::from_millis(config.delay_ms);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match config.stat {
        StatKind::Overview => monitor::overview(&store, delay, &mut out).await,
        StatKind::Vmstat => monitor::vmstat(&store, delay, &mut out).await,
        StatKind::Latency => monitor::latency(&store, delay, &mut out).await,
        StatKind::Vmpage => {
            let rng = Box::new(RngSource::from_seed_option(config.seed));
            report::vmpage(&store, &config, SimulationConfig::default(), rng, &mut out).await
        }
        StatKind::OndiskSize => report::ondisk_size(&store, &config, &mut out).await,
    };

    settle(result)
}

/// Non-fatal errors are logged and swallowed. Fatal ones are returned once;
/// anyhow's `main` reports them and exits non-zero.
fn settle(result: Result<(), StatError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if !e.is_fatal() => {
            warn!("{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
