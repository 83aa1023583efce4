//! Run assembly and entry points
//!
//! This module wires a validated configuration into a runnable harvest:
//! it opens the output sink, builds one fetcher per worker slot, arms the
//! optional run deadline, and hands everything to the orchestrator. The
//! fixture entry point does the same pipeline minus the network.

use crate::config::Config;
use crate::harvest::extract_stories;
use crate::harvest::fetcher::{build_http_client, HttpFetcher};
use crate::harvest::pool::{Orchestrator, RunResult};
use crate::sink::{timestamped_filename, CsvSink, RecordSink};
use crate::Result;
use chrono::Local;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs a complete harvest over the configured page range
///
/// This is the main entry point for a real run. It will:
/// 1. Open the timestamped output file in append mode
/// 2. Build one HTTP fetcher per worker slot
/// 3. Arm the run deadline, when one is configured
/// 4. Dispatch every page in the range to the worker pool
/// 5. Return the aggregated counters
///
/// # Arguments
///
/// * `config` - The validated harvester configuration
///
/// # Returns
///
/// * `Ok(RunResult)` - The run finished; failed pages are listed inside
/// * `Err(RakeError)` - Setup failed, or records could not be persisted
pub async fn run_harvest(config: Config) -> Result<RunResult> {
    let output_path = output_path(&config);
    let sink: Arc<dyn RecordSink> = Arc::new(CsvSink::create(&output_path)?);
    tracing::info!("Appending records to {}", output_path.display());

    let workers = config.pool.effective_workers();
    let load_timeout = Duration::from_millis(config.fetch.load_timeout_ms);
    let mut fetchers = Vec::with_capacity(workers);
    for _ in 0..workers {
        let client = build_http_client(load_timeout)?;
        fetchers.push(HttpFetcher::new(client, &config.source, &config.fetch));
    }

    let orchestrator = Orchestrator::new(fetchers, sink, config.fetch.clone());

    let watchdog = if config.pool.run_timeout_ms > 0 {
        let deadline = Duration::from_millis(config.pool.run_timeout_ms);
        let abort = orchestrator.abort_handle();
        Some(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            tracing::warn!(
                "Run deadline of {}ms reached, stopping dispatch",
                deadline.as_millis()
            );
            abort.abort();
        }))
    } else {
        None
    };

    let result = orchestrator
        .run(config.source.first_page, config.source.last_page)
        .await;

    // The deadline no longer matters once the run is over
    if let Some(watchdog) = watchdog {
        watchdog.abort();
    }

    result
}

/// Extracts and appends records from a local fixture file
///
/// Test mode for the whole downstream pipeline: no page is fetched, no
/// client is built. The fixture markup goes through the same extraction
/// and sink path a fetched page would.
///
/// # Arguments
///
/// * `config` - The harvester configuration (only output settings are used)
/// * `fixture` - Path to a saved listing page
///
/// # Returns
///
/// * `Ok(RunResult)` - Records extracted and appended
/// * `Err(RakeError)` - The fixture could not be read, or the append failed
pub fn run_fixture(config: &Config, fixture: &Path) -> Result<RunResult> {
    let start_time = Instant::now();
    tracing::info!(
        "Test mode: extracting from {} instead of the network",
        fixture.display()
    );

    let html = std::fs::read_to_string(fixture)?;

    let output_path = output_path(config);
    let sink = CsvSink::create(&output_path)?;
    tracing::info!("Appending records to {}", output_path.display());

    let stories = match extract_stories(&html) {
        Ok(stories) => stories,
        Err(error) => {
            tracing::warn!("Fixture {}: {}", fixture.display(), error);
            Vec::new()
        }
    };

    let written = sink.append(&stories)?;
    tracing::info!("Fixture produced {} records", written);

    Ok(RunResult {
        records_written: written as u64,
        pages_failed: BTreeSet::new(),
        elapsed: start_time.elapsed(),
    })
}

/// Output file path for a run starting now
fn output_path(config: &Config) -> PathBuf {
    let filename = timestamped_filename(&config.output.prefix, Local::now());
    Path::new(&config.output.directory).join(filename)
}
