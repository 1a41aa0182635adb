//! File-backed checkpoint store
//!
//! This module provides a `CheckpointStore` built on three plain files: the
//! record stream, a JSON checkpoint and the fault log.

use crate::config::OutputConfig;
use crate::node::{NodeId, NodeRecord};
use crate::state::CrawlState;
use crate::storage::traits::{CheckpointStore, FaultEntry, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Version written into every checkpoint
const CHECKPOINT_VERSION: u32 = 1;

/// On-disk layout of the checkpoint
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    version: u32,
    saved_at: DateTime<Utc>,
    /// Byte length of the record stream covered by this checkpoint
    output_cursor: u64,
    frontier: Vec<NodeId>,
    visited: BTreeSet<NodeId>,
}

/// A checkpoint as read from disk, without touching the record stream
#[derive(Debug, Clone)]
pub struct CheckpointSnapshot {
    pub saved_at: DateTime<Utc>,
    pub output_cursor: u64,
    pub state: CrawlState,
}

/// Reads and validates a checkpoint file
pub fn read_checkpoint(path: &Path) -> StorageResult<CheckpointSnapshot> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let file: CheckpointFile =
        serde_json::from_str(&content).map_err(|e| StorageError::corrupt(path, e))?;

    if file.version != CHECKPOINT_VERSION {
        return Err(StorageError::corrupt(
            path,
            format!("unsupported version {}", file.version),
        ));
    }

    let state = CrawlState::from_parts(file.frontier, file.visited)
        .map_err(|e| StorageError::invariant(path, e))?;

    Ok(CheckpointSnapshot {
        saved_at: file.saved_at,
        output_cursor: file.output_cursor,
        state,
    })
}

/// Checkpoint store backed by files in a single directory
///
/// Records are appended to the output stream as they are produced. Each
/// checkpoint stores the byte length of the stream it covers, so records
/// written after the last checkpoint are cut off on restore and written again
/// when their nodes are revisited.
pub struct FileCheckpointStore {
    records_path: PathBuf,
    checkpoint_path: PathBuf,
    error_log_path: PathBuf,
    output: Option<File>,
    committed_len: u64,
}

impl FileCheckpointStore {
    /// Creates a store over explicit paths
    pub fn new(
        records_path: impl Into<PathBuf>,
        checkpoint_path: impl Into<PathBuf>,
        error_log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            records_path: records_path.into(),
            checkpoint_path: checkpoint_path.into(),
            error_log_path: error_log_path.into(),
            output: None,
            committed_len: 0,
        }
    }

    /// Creates a store over the paths named in the output configuration
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(
            config.records_path(),
            config.checkpoint_path(),
            config.error_log_path(),
        )
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn error_log_path(&self) -> &Path {
        &self.error_log_path
    }

    /// Byte length of the record stream written so far
    pub fn output_cursor(&self) -> u64 {
        self.committed_len
    }

    fn temp_checkpoint_path(&self) -> PathBuf {
        let mut name = self
            .checkpoint_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.checkpoint_path.with_file_name(name)
    }

    /// Finds an unused `<stem>_<epoch>.<ext>` path next to the record stream
    fn rotated_path(&self) -> PathBuf {
        let stem = self
            .records_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let ext = self
            .records_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let epoch = Utc::now().timestamp();

        let mut candidate = self
            .records_path
            .with_file_name(format!("{}_{}{}", stem, epoch, ext));
        let mut n = 1;
        while candidate.exists() {
            candidate = self
                .records_path
                .with_file_name(format!("{}_{}_{}{}", stem, epoch, n, ext));
            n += 1;
        }
        candidate
    }
}

/// Flushes the directory entry of `path` so a completed rename survives a crash
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}

impl CheckpointStore for FileCheckpointStore {
    fn has_checkpoint(&self) -> bool {
        self.checkpoint_path.exists()
    }

    fn load_checkpoint(&mut self) -> StorageResult<(CrawlState, u64)> {
        let snapshot = read_checkpoint(&self.checkpoint_path)?;

        if !self.records_path.exists() {
            return Err(StorageError::MissingOutput {
                checkpoint: self.checkpoint_path.clone(),
                output: self.records_path.clone(),
            });
        }

        let mut file = OpenOptions::new().write(true).open(&self.records_path)?;
        let len = file.metadata()?.len();
        let cursor = snapshot.output_cursor;

        if len < cursor {
            return Err(StorageError::corrupt(
                &self.checkpoint_path,
                format!(
                    "output {} is {} bytes but the checkpoint covers {} bytes",
                    self.records_path.display(),
                    len,
                    cursor
                ),
            ));
        }

        if len > cursor {
            warn!(
                "Discarding {} bytes of records written after the last checkpoint",
                len - cursor
            );
            file.set_len(cursor)?;
            file.sync_data()?;
        }

        file.seek(SeekFrom::Start(cursor))?;
        self.output = Some(file);
        self.committed_len = cursor;

        debug!(
            "Restored checkpoint from {} (frontier: {}, visited: {})",
            snapshot.saved_at,
            snapshot.state.frontier_len(),
            snapshot.state.visited_len()
        );

        Ok((snapshot.state, cursor))
    }

    fn save_checkpoint(&mut self, state: &CrawlState) -> StorageResult<()> {
        // Records covered by the checkpoint must be durable before it is
        if let Some(file) = self.output.as_mut() {
            file.flush()?;
            file.sync_data()?;
        }

        let document = CheckpointFile {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            output_cursor: self.committed_len,
            frontier: state.frontier().to_vec(),
            visited: state.visited().clone(),
        };

        let tmp_path = self.temp_checkpoint_path();
        {
            let mut tmp = File::create(&tmp_path)?;
            serde_json::to_writer(&mut tmp, &document)?;
            tmp.write_all(b"\n")?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.checkpoint_path)?;
        sync_parent_dir(&self.checkpoint_path)?;

        debug!(
            "Checkpoint saved (frontier: {}, visited: {}, cursor: {})",
            state.frontier_len(),
            state.visited_len(),
            self.committed_len
        );
        Ok(())
    }

    fn discard_checkpoint(&mut self) -> StorageResult<()> {
        for path in [self.checkpoint_path.clone(), self.temp_checkpoint_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn rotate_output_if_present(&mut self) -> StorageResult<Option<PathBuf>> {
        self.output = None;
        self.committed_len = 0;

        if !self.records_path.exists() {
            return Ok(None);
        }

        let target = self.rotated_path();
        fs::rename(&self.records_path, &target)?;
        Ok(Some(target))
    }

    fn start_output(&mut self) -> StorageResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.records_path)?;
        self.output = Some(file);
        self.committed_len = 0;
        Ok(())
    }

    fn append_record(&mut self, record: &NodeRecord) -> StorageResult<()> {
        let file = self.output.as_mut().ok_or(StorageError::OutputNotOpen)?;

        let mut line = record.encode_line();
        line.push('\n');
        file.write_all(line.as_bytes())?;

        self.committed_len += line.len() as u64;
        Ok(())
    }

    fn log_fault(&mut self, entry: &FaultEntry) -> StorageResult<()> {
        let mut log = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.error_log_path)?;
        log.write_all(entry.render().as_bytes())?;
        log.sync_data()?;
        Ok(())
    }
}
