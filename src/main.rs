//! Subreddit Mapper main entry point
//!
//! This is the command-line interface for the subreddit graph crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use subreddit_mapper::config::{load_config_with_hash, Config};
use subreddit_mapper::crawler::{run_crawl, CrawlOutcome, RunExit, SeedSource, Seeder};
use subreddit_mapper::storage::read_checkpoint;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Subreddit Mapper: a resumable subreddit graph crawler
///
/// Walks the subreddit graph from a set of seeds, following every sidebar
/// reference to another subreddit or multireddit. Progress is checkpointed,
/// so an interrupted or failed run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "subreddit-mapper")]
#[command(version)]
#[command(about = "A resumable subreddit graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard the checkpoint and start over (the old output is kept aside)
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    fresh: bool,

    /// Validate config and show the seeds that would be used without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the existing output and checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return RunExit::Failure.into();
        }
    };

    // Handle different modes
    let aux = if cli.dry_run {
        Some(handle_dry_run(&config))
    } else if cli.stats {
        Some(handle_stats(&config))
    } else {
        None
    };

    match aux {
        Some(Ok(())) => RunExit::Success.into(),
        Some(Err(e)) => {
            tracing::error!("{:#}", e);
            RunExit::Failure.into()
        }
        None => handle_crawl(config, cli.fresh).await.into(),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("subreddit_mapper=info,warn"),
            1 => EnvFilter::new("subreddit_mapper=debug,info"),
            2 => EnvFilter::new("subreddit_mapper=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the seeds
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Subreddit Mapper Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Checkpoint interval: {} visits",
        config.crawler.checkpoint_interval
    );
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Seed delay: {}ms", config.crawler.seed_delay_ms);
    println!("  Skip missing nodes: {}", config.crawler.skip_missing_nodes);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nPlatform:");
    println!("  Base URL: {}", config.platform.base_url);
    println!("  Timeout: {}s", config.platform.timeout_secs);

    println!("\nOutput:");
    println!("  Records: {}", config.output.records_path().display());
    println!("  Checkpoint: {}", config.output.checkpoint_path().display());
    println!("  Error log: {}", config.output.error_log_path().display());
    println!("  Seed cache: {}", config.output.seed_cache_path().display());

    println!("\n✓ Configuration is valid");

    let checkpoint = config.output.checkpoint_path();
    if checkpoint.exists() {
        let snapshot = read_checkpoint(&checkpoint)
            .with_context(|| format!("Failed to read {}", checkpoint.display()))?;
        if !snapshot.state.is_exhausted() {
            println!(
                "✓ Would resume from {} ({} in frontier)",
                checkpoint.display(),
                snapshot.state.frontier_len()
            );
            return Ok(());
        }
        println!("✓ Previous crawl is complete; its output would be moved aside");
    }

    let seeder = Seeder::from_config(config);
    match seeder.local_seeds() {
        Some((source, seeds)) => {
            let from = match source {
                SeedSource::Config => "configuration".to_string(),
                _ => seeder.cache_path().display().to_string(),
            };
            println!("✓ Would start with {} seeds from {}:", seeds.len(), from);
            for seed in &seeds {
                println!("  - {}", seed);
            }
        }
        None => println!("✓ Would fetch seeds from the default listing"),
    }

    Ok(())
}

/// Handles the --stats mode: summarises the existing output and checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use subreddit_mapper::output::{load_statistics, print_statistics};

    let records = config.output.records_path();
    println!("Records: {}\n", records.display());

    let stats = load_statistics(&records, &config.output.checkpoint_path())
        .with_context(|| format!("Failed to read statistics from {}", records.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> RunExit {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if a checkpoint exists)");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current node");
            let _ = shutdown_tx.send(true);
        }
        // A second interrupt abandons the current node; the last checkpoint
        // is still a valid resumption point
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Second interrupt received, exiting immediately");
            std::process::exit(i32::from(RunExit::Cancelled.code()));
        }
    });

    match run_crawl(config, fresh, shutdown_rx).await {
        Ok(outcome) => {
            match &outcome {
                CrawlOutcome::Completed { visited } => {
                    tracing::info!("Crawl completed successfully ({} nodes this run)", visited)
                }
                CrawlOutcome::Faulted { node, error } => {
                    tracing::error!("Crawl stopped at {}: {}", node, error)
                }
                CrawlOutcome::Cancelled { visited } => {
                    tracing::info!("Crawl cancelled ({} nodes this run)", visited)
                }
            }
            RunExit::from_outcome(&outcome)
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            RunExit::from_error(&e)
        }
    }
}
