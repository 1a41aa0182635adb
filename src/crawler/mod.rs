//! Crawler module for subreddit graph traversal
//!
//! This module contains the core crawling logic, including:
//! - Platform access over HTTP with request pacing
//! - Sidebar parsing and collection expansion
//! - Seed loading
//! - The crawl engine and run bootstrap

mod engine;
mod fetcher;
mod parser;
mod seeder;

pub use engine::{CrawlEngine, CrawlOutcome, EngineOptions};
pub use fetcher::{
    build_http_client, classify_status, HttpPlatformClient, PlatformClient, RequestPacer,
};
pub use parser::{extract_edges, find_collection_references, find_node_references, CollectionRef};
pub use seeder::{DefaultListing, Pacing, SeedSource, Seeder};

use crate::config::Config;
use crate::state::CrawlState;
use crate::storage::{open_store, CheckpointStore, StorageError};
use crate::MapperError;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::info;

/// Process-level result of a crawl invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The frontier was exhausted
    Success,

    /// A fault stopped the run; state was saved and a rerun resumes it
    Faulted,

    /// A checkpoint exists but its output stream is gone
    MissingOutput,

    /// Interrupted by the operator; state was saved
    Cancelled,

    /// Anything else (bad config, corrupt checkpoint, failed checkpoint write)
    Failure,
}

impl RunExit {
    /// Returns the process exit code
    ///
    /// | Exit | Code |
    /// |------|------|
    /// | Success | 0 |
    /// | Faulted | 75 (`EX_TEMPFAIL`) |
    /// | MissingOutput | 66 (`EX_NOINPUT`) |
    /// | Cancelled | 130 |
    /// | Failure | 1 |
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Faulted => 75,
            Self::MissingOutput => 66,
            Self::Cancelled => 130,
            Self::Failure => 1,
        }
    }

    pub fn from_outcome(outcome: &CrawlOutcome) -> Self {
        match outcome {
            CrawlOutcome::Completed { .. } => Self::Success,
            CrawlOutcome::Faulted { .. } => Self::Faulted,
            CrawlOutcome::Cancelled { .. } => Self::Cancelled,
        }
    }

    pub fn from_error(error: &MapperError) -> Self {
        match error {
            MapperError::Storage(StorageError::MissingOutput { .. }) => Self::MissingOutput,
            _ => Self::Failure,
        }
    }
}

impl From<RunExit> for ExitCode {
    fn from(exit: RunExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Restores or creates the state a run starts from
///
/// # Decision
///
/// 1. `fresh` discards any existing checkpoint
/// 2. A checkpoint with work left → restore it (the output stream must exist)
/// 3. A checkpoint with an empty frontier belongs to a finished crawl and is
///    discarded
/// 4. Otherwise load seeds, rotate a previous output aside, start an empty
///    output and checkpoint the seeded state
pub async fn prepare_run<S, L>(
    store: &mut S,
    seeder: &Seeder,
    listing: &L,
    fresh: bool,
) -> Result<CrawlState, MapperError>
where
    S: CheckpointStore,
    L: DefaultListing + ?Sized,
{
    if fresh && store.has_checkpoint() {
        info!("Discarding existing checkpoint for a fresh run");
        store.discard_checkpoint()?;
    }

    if store.has_checkpoint() {
        let (state, cursor) = store.load_checkpoint()?;
        if !state.is_exhausted() {
            info!(
                "Resuming from checkpoint: {} in frontier, {} visited, output at byte {}",
                state.frontier_len(),
                state.visited_len(),
                cursor
            );
            return Ok(state);
        }

        info!(
            "Previous crawl completed with {} visited; starting a new one",
            state.visited_len()
        );
        store.discard_checkpoint()?;
    }

    let seeds = seeder.load_seeds(listing).await?;
    if seeds.is_empty() {
        tracing::warn!("No seeds available; the crawl will end immediately");
    }

    if let Some(rotated) = store.rotate_output_if_present()? {
        info!("Moved previous output to {}", rotated.display());
    }

    let state = CrawlState::seeded(seeds);
    store.start_output()?;
    store.save_checkpoint(&state)?;
    info!("Starting fresh crawl with {} seeds", state.frontier_len());

    Ok(state)
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting or resuming a crawl. It will:
/// 1. Open the checkpoint store
/// 2. Build the HTTP platform client
/// 3. Restore the last checkpoint or seed a fresh run
/// 4. Drive the engine until it stops
///
/// # Example
///
/// ```no_run
/// use subreddit_mapper::config::load_config;
/// use subreddit_mapper::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("mapper.toml"))?;
/// let (_tx, rx) = tokio::sync::watch::channel(false);
/// let outcome = run_crawl(config, false, rx).await?;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    fresh: bool,
    shutdown: watch::Receiver<bool>,
) -> Result<CrawlOutcome, MapperError> {
    let mut store = open_store(&config.output)?;
    let client = HttpPlatformClient::new(&config)?;
    let seeder = Seeder::from_config(&config);

    let state = prepare_run(&mut store, &seeder, &client, fresh).await?;

    let mut engine = CrawlEngine::new(client, store, state, EngineOptions::from(&config.crawler))
        .with_shutdown(shutdown);
    engine.run().await
}
