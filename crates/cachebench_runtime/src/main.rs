//! Cachebench Runtime
//!
//! Runs every sweep against the default topology and prints the report to
//! stdout. Logs go to stderr.

use anyhow::{Context, Result};
use cachebench_core::{BenchConfig, Harness};
use cachebench_metrics::MonotonicClock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    tracing::info!("Cachebench v{}", cachebench_core::VERSION);

    let config = BenchConfig::default();

    // Random patterns differ run to run; tests seed explicitly instead.
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    tracing::info!(seed, "seeded random access patterns");

    let stdout = io::stdout();
    let mut harness = Harness::new(
        config,
        MonotonicClock::new(),
        StdRng::seed_from_u64(seed),
        stdout.lock(),
    )
    .context("default configuration is invalid")?;
    harness.run_all().context("failed to write report")?;

    tracing::info!("all sweeps complete");
    Ok(())
}
