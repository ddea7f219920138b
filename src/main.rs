//! # Tone Harvest
//!
//! Collects GDELT tone-chart coverage for a topic per country and time
//! window, fetches the top articles of every tone bucket, extracts their
//! readable text and appends one JSON line per window to a
//! per-country/per-month file.
//!
//! ## Usage
//!
//! ```sh
//! tone_harvest -c harvest.yaml        # every configured country
//! tone_harvest -c harvest.yaml GM     # only Germany
//! ```
//!
//! ## Architecture
//!
//! 1. **Planning**: split the date range into windows, one task per country and window
//! 2. **Histogram**: query the tone chart for each task
//! 3. **Fetching**: download the sampled articles (bounded async concurrency)
//! 4. **Extraction**: title/body extraction on a CPU worker pool
//! 5. **Output**: re-bucket the survivors and append the chart under a per-file lock

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod error;
mod gdelt;
mod models;
mod outputs;
mod pipeline;
mod planner;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use error::HarvestError;
use pipeline::Harvester;
use planner::{build_tasks, plan_windows};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("tone_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(country) = args.country {
        config.countries = vec![country.trim().to_uppercase()];
        config.validate()?;
        info!(country = %config.countries[0], "Country overridden from command line");
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Plan ----
    let delta = config
        .window()
        .ok_or_else(|| HarvestError::Config("window_hours must be positive".to_string()))?;
    let windows = plan_windows(config.start_date, config.end_date, delta);
    let mut tasks = build_tasks(&config.countries, &windows, &config.query_spec());
    if let Some(max) = config.max_tasks {
        tasks.truncate(max);
    }
    info!(
        windows = windows.len(),
        countries = config.countries.len(),
        tasks = tasks.len(),
        "Planned harvest"
    );

    // ---- Harvest ----
    let harvester = Harvester::from_config(&config)?;
    let summary = harvester.run(tasks).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        succeeded = summary.succeeded,
        failed = summary.failed,
        panicked = summary.panicked,
        "Execution complete"
    );

    Ok(())
}
