//! Storage module for persisting crawl progress
//!
//! This module handles all durable state of a crawl:
//! - The append-only record stream (one line per visited node)
//! - The checkpoint holding the frontier and visited set
//! - The fault log
//! - Rotation of a previous run's output

mod files;
mod traits;

pub use files::{read_checkpoint, CheckpointSnapshot, FileCheckpointStore};
pub use traits::{CheckpointStore, FaultEntry, StorageError, StorageResult};

use crate::config::OutputConfig;
use crate::MapperError;

/// Opens the file-backed store for an output configuration
///
/// Creates the output directory if it does not exist yet.
pub fn open_store(config: &OutputConfig) -> Result<FileCheckpointStore, MapperError> {
    std::fs::create_dir_all(&config.directory)?;
    Ok(FileCheckpointStore::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_creates_directory() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            directory: dir.path().join("nested/out"),
            ..OutputConfig::default()
        };

        let store = open_store(&config).unwrap();
        assert!(config.directory.is_dir());
        assert_eq!(store.records_path(), config.records_path());
        assert!(!store.has_checkpoint());
    }
}
