//! Newsrake main entry point
//!
//! This is the command-line interface for the Newsrake listing harvester.

use anyhow::Context;
use clap::Parser;
use newsrake::config::load_config_with_hash;
use newsrake::harvest::{run_fixture, run_harvest, RunResult};
use newsrake::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Newsrake: a concurrent news listing harvester
///
/// Newsrake fetches paginated listing pages in parallel, extracts story
/// records from the markup, and appends them to a shared timestamped
/// CSV file.
#[derive(Parser, Debug)]
#[command(name = "newsrake")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent news listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase log detail (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Extract from a saved listing page instead of fetching (no network)
    #[arg(long, value_name = "FIXTURE", conflicts_with = "dry_run")]
    test: Option<PathBuf>,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration; without a file the built-in
    // defaults target the public Hacker News listing
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((config, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            Config::default()
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(fixture) = cli.test.as_deref() {
        let result = run_fixture(&config, fixture)
            .with_context(|| format!("fixture run failed for {}", fixture.display()))?;
        print_report(&result);
    } else {
        handle_harvest(config).await?;
    }

    Ok(())
}

/// Installs the tracing subscriber with a filter matching the CLI flags
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newsrake=info,warn"),
            1 => EnvFilter::new("newsrake=debug,info"),
            2 => EnvFilter::new("newsrake=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Newsrake Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Ready marker: {}", config.source.ready_marker);
    println!(
        "  Pages: {}..={} ({} pages)",
        config.source.first_page,
        config.source.last_page,
        config.source.page_count()
    );

    println!("\nFetch:");
    println!("  Load timeout: {}ms", config.fetch.load_timeout_ms);
    println!("  Poll interval: {}ms", config.fetch.poll_interval_ms);
    println!("  Attempts per page: {}", config.fetch.attempts);
    println!("  Settle delay: {}ms", config.fetch.settle_delay_ms);

    println!("\nPool:");
    if config.pool.workers > 0 {
        println!("  Workers: {}", config.pool.workers);
    } else {
        println!(
            "  Workers: {} (available parallelism - 1)",
            config.pool.effective_workers()
        );
    }
    if config.pool.run_timeout_ms > 0 {
        println!("  Run timeout: {}ms", config.pool.run_timeout_ms);
    } else {
        println!("  Run timeout: none");
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  File: {}_<timestamp>.csv (append)", config.output.prefix);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest {} pages with {} workers",
        config.source.page_count(),
        config.pool.effective_workers()
    );
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting harvest: pages {}..={}, {} workers",
        config.source.first_page,
        config.source.last_page,
        config.pool.effective_workers()
    );

    match run_harvest(config).await {
        Ok(result) => {
            print_report(&result);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Prints the end-of-run report
fn print_report(result: &RunResult) {
    println!("\n=== Harvest Report ===");
    println!("Records written: {}", result.records_written);

    if result.pages_failed.is_empty() {
        println!("Failed pages: none");
    } else {
        let pages: Vec<String> = result.pages_failed.iter().map(|p| p.to_string()).collect();
        println!(
            "Failed pages ({}): {}",
            result.pages_failed.len(),
            pages.join(", ")
        );
    }

    println!("Elapsed run time: {:.2} seconds", result.elapsed_seconds());
}
