//! Crawl engine - main traversal loop
//!
//! This module contains the loop that coordinates a crawl run, including:
//! - Popping nodes from the frontier and fetching them
//! - Extracting outbound edges and enqueueing unseen nodes
//! - Appending visit records
//! - Periodic checkpointing and progress reporting
//! - The fault policy and cancellation

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::PlatformClient;
use crate::crawler::parser::extract_edges;
use crate::node::{NodeId, NodeRecord};
use crate::state::{CrawlState, EngineState};
use crate::storage::{CheckpointStore, FaultEntry};
use crate::{MapperError, PlatformError};
use std::time::Instant;
use tokio::sync::watch;

/// Tunables of the crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Recorded visits between periodic checkpoints (0 disables them)
    pub checkpoint_interval: u32,

    /// Drop nodes the platform reports as missing instead of faulting
    pub skip_missing_nodes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 50,
            skip_missing_nodes: false,
        }
    }
}

impl From<&CrawlerConfig> for EngineOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            checkpoint_interval: config.checkpoint_interval,
            skip_missing_nodes: config.skip_missing_nodes,
        }
    }
}

/// How a crawl run ended
#[derive(Debug)]
pub enum CrawlOutcome {
    /// The frontier was exhausted
    Completed { visited: u64 },

    /// Visiting `node` failed; it was re-queued and the state saved
    Faulted { node: NodeId, error: MapperError },

    /// Cancellation was observed between two visits; the state was saved
    Cancelled { visited: u64 },
}

/// Result of a single visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Recorded,
    Skipped,
}

/// Drives a crawl over a platform client and a checkpoint store
pub struct CrawlEngine<C, S> {
    client: C,
    store: S,
    state: CrawlState,
    options: EngineOptions,
    phase: EngineState,
    shutdown: Option<watch::Receiver<bool>>,
    visited: u64,
}

impl<C, S> CrawlEngine<C, S>
where
    C: PlatformClient,
    S: CheckpointStore,
{
    /// Creates an engine over a fresh or restored state
    pub fn new(client: C, store: S, state: CrawlState, options: EngineOptions) -> Self {
        Self {
            client,
            store,
            state,
            options,
            phase: EngineState::Idle,
            shutdown: None,
            visited: 0,
        }
    }

    /// Stops the run at the next iteration boundary once `shutdown` reads true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn phase(&self) -> EngineState {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of records written during this run
    pub fn visited(&self) -> u64 {
        self.visited
    }

    /// Runs the crawl until the frontier is empty, a fault occurs, or
    /// cancellation is observed
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The run ended and its state was checkpointed
    /// * `Err(MapperError)` - A checkpoint could not be written, or the engine
    ///   was already used
    pub async fn run(&mut self) -> Result<CrawlOutcome, MapperError> {
        self.transition(EngineState::Running)?;
        tracing::info!(
            "Starting crawl: {} in frontier, {} visited",
            self.state.frontier_len(),
            self.state.visited_len()
        );

        let start_time = Instant::now();

        loop {
            if self.cancel_requested() {
                tracing::info!("Cancellation requested, saving checkpoint");
                self.store.save_checkpoint(&self.state)?;
                self.transition(EngineState::Stopped)?;
                return Ok(CrawlOutcome::Cancelled {
                    visited: self.visited,
                });
            }

            let Some(node) = self.state.pop() else {
                self.transition(EngineState::Draining)?;
                tracing::info!("Frontier is empty, crawl complete");
                self.store.save_checkpoint(&self.state)?;
                self.transition(EngineState::Stopped)?;
                tracing::info!(
                    "Crawl completed: {} nodes recorded in {:?}",
                    self.visited,
                    start_time.elapsed()
                );
                return Ok(CrawlOutcome::Completed {
                    visited: self.visited,
                });
            };

            match self.visit(&node).await {
                Ok(Visit::Recorded) => {
                    self.visited += 1;
                    self.after_record(start_time)?;
                }
                Ok(Visit::Skipped) => {}
                Err(error) => return self.fault(node, error),
            }
        }
    }

    /// Fetches a node, records it and enqueues its unseen neighbours
    async fn visit(&mut self, node: &NodeId) -> Result<Visit, MapperError> {
        tracing::debug!("Visiting {}", node);

        let about = match self.client.fetch_node(node).await {
            Ok(about) => about,
            Err(PlatformError::PermissionDenied { .. }) => {
                tracing::warn!("Skipping {}: access forbidden", node);
                return Ok(Visit::Skipped);
            }
            Err(PlatformError::NotFound { .. }) if self.options.skip_missing_nodes => {
                tracing::warn!("Skipping {}: not found", node);
                return Ok(Visit::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        let edges = extract_edges(&self.client, node, &about.description).await?;
        let record = NodeRecord::new(node.clone(), &about, edges);

        let discovered = record
            .outbound_edges
            .iter()
            .filter(|edge| self.state.discover((*edge).clone()))
            .count();

        self.store.append_record(&record)?;

        tracing::debug!(
            "Recorded {} ({} edges, {} new)",
            node,
            record.outbound_edges.len(),
            discovered
        );
        Ok(Visit::Recorded)
    }

    /// Periodic checkpoint and progress report
    fn after_record(&mut self, start_time: Instant) -> Result<(), MapperError> {
        let interval = u64::from(self.options.checkpoint_interval);
        if interval == 0 || self.visited % interval != 0 {
            return Ok(());
        }

        self.store.save_checkpoint(&self.state)?;

        let elapsed = start_time.elapsed();
        let rate = self.visited as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "Progress: {} nodes recorded, {} in frontier, {} visited, {:.2} nodes/sec",
            self.visited,
            self.state.frontier_len(),
            self.state.visited_len(),
            rate
        );
        Ok(())
    }

    /// Re-queues the failing node, saves the state and logs the fault
    ///
    /// When the save itself fails the fault is still logged before the
    /// storage error is returned.
    fn fault(&mut self, node: NodeId, error: MapperError) -> Result<CrawlOutcome, MapperError> {
        self.state.requeue(node.clone());
        self.transition(EngineState::Faulting)?;

        if let Err(save_error) = self.store.save_checkpoint(&self.state) {
            self.record_fault(&node, &error);
            tracing::error!("Could not save state after the fault: {}", save_error);
            return Err(save_error.into());
        }
        self.record_fault(&node, &error);

        self.transition(EngineState::Stopped)?;
        tracing::info!(
            "State saved with {} on top of the frontier; rerun to resume",
            node
        );

        Ok(CrawlOutcome::Faulted { node, error })
    }

    fn record_fault(&mut self, node: &NodeId, error: &MapperError) {
        tracing::error!("Fault while visiting {}: {}", node, error);
        let entry = FaultEntry::from_error(Some(node.clone()), error);
        if let Err(e) = self.store.log_fault(&entry) {
            tracing::error!("Could not append to the fault log: {}", e);
        }
    }

    fn cancel_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn transition(&mut self, to: EngineState) -> Result<(), MapperError> {
        if !self.phase.can_transition_to(to) {
            return Err(MapperError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Engine {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }
}
