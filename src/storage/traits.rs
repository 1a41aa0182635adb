//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and the
//! associated error and fault-log types.

use crate::node::{NodeId, NodeRecord};
use crate::state::{CrawlState, StateInvariantError};
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No checkpoint found at {0}")]
    NotFound(PathBuf),

    #[error(
        "Checkpoint {checkpoint} exists but output {output} is missing; \
         delete the checkpoint to start over"
    )]
    MissingOutput { checkpoint: PathBuf, output: PathBuf },

    #[error("Corrupt checkpoint {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Output stream is not open")]
    OutputNotOpen,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invariant(path: impl Into<PathBuf>, err: StateInvariantError) -> Self {
        Self::corrupt(path, err)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of the fault log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultEntry {
    pub timestamp: DateTime<Utc>,
    /// The node being visited when the fault occurred
    pub node: Option<NodeId>,
    pub message: String,
    /// Debug rendering of the error followed by its source chain
    pub detail: String,
}

impl FaultEntry {
    /// Builds an entry from an error, capturing its full source chain
    pub fn from_error(node: Option<NodeId>, error: &(dyn StdError + 'static)) -> Self {
        let mut detail = format!("{:?}", error);
        let mut source = error.source();
        while let Some(cause) = source {
            detail.push_str(&format!("\ncaused by: {}", cause));
            source = cause.source();
        }

        Self {
            timestamp: Utc::now(),
            node,
            message: error.to_string(),
            detail,
        }
    }

    /// Renders the entry the way it is appended to the fault log
    pub fn render(&self) -> String {
        let node = self
            .node
            .as_ref()
            .map(NodeId::as_str)
            .unwrap_or("<none>");
        format!(
            "\n\n{}\nnode: {}\nerror: {}\n{}\n",
            self.timestamp.to_rfc3339(),
            node,
            self.message,
            self.detail
        )
    }
}

/// Trait for checkpoint backends
///
/// A backend owns two durable resources: a checkpoint slot holding the last
/// saved `CrawlState`, and an append-only stream of visit records. Only one
/// process may use a given pair at a time.
pub trait CheckpointStore {
    // ===== Checkpoint Slot =====

    /// Returns true if a checkpoint exists
    fn has_checkpoint(&self) -> bool;

    /// Restores the last saved state and reopens the output stream
    ///
    /// # Returns
    ///
    /// The restored state and the committed output cursor. Fails with
    /// `NotFound` if there is no checkpoint and with `MissingOutput` if the
    /// checkpoint exists but the output stream does not.
    fn load_checkpoint(&mut self) -> StorageResult<(CrawlState, u64)>;

    /// Durably replaces the checkpoint with `state`
    ///
    /// Must be atomic: a crash during the save leaves the previous checkpoint
    /// intact.
    fn save_checkpoint(&mut self, state: &CrawlState) -> StorageResult<()>;

    /// Deletes the checkpoint, if any
    fn discard_checkpoint(&mut self) -> StorageResult<()>;

    // ===== Output Stream =====

    /// Renames an existing output stream aside before a fresh run
    ///
    /// Returns the new path of the old stream, or None if there was none.
    fn rotate_output_if_present(&mut self) -> StorageResult<Option<PathBuf>>;

    /// Creates an empty output stream for a fresh run
    fn start_output(&mut self) -> StorageResult<()>;

    /// Appends one record; prior records are never rewritten
    fn append_record(&mut self, record: &NodeRecord) -> StorageResult<()>;

    // ===== Fault Log =====

    /// Appends a fault entry to the error log
    fn log_fault(&mut self, entry: &FaultEntry) -> StorageResult<()>;
}
