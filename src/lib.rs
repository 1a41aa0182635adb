//! Subreddit Mapper: a resumable subreddit graph crawler
//!
//! This crate walks the subreddit graph of the platform, treating every sidebar
//! mention of another subreddit (including mentions reachable through
//! multireddits) as a directed edge. Every visited subreddit is written once to
//! an append-only record stream, and the traversal state is checkpointed so an
//! interrupted or faulted run resumes exactly where it stopped.

pub mod config;
pub mod crawler;
pub mod node;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid node name: {0}")]
    Node(#[from] NodeError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid engine transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::EngineState,
        to: state::EngineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised when a raw name is not a legal subreddit name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("name is empty")]
    Empty,

    #[error("name '{name}' contains illegal character {ch:?}")]
    IllegalCharacter { name: String, ch: char },

    #[error("name '{name}' is longer than {max} characters")]
    TooLong { name: String, max: usize },
}

/// Faults reported by the platform client
///
/// The engine dispatches on these variants to decide between skipping a node
/// and stopping the crawl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("access to {resource} is forbidden")]
    PermissionDenied { resource: String },

    #[error("{resource} does not exist")]
    NotFound { resource: String },

    #[error("transient failure fetching {resource}: {message}")]
    Transient { resource: String, message: String },
}

impl PlatformError {
    /// Builds a transient fault for the given resource
    pub fn transient(resource: impl Into<String>, message: impl ToString) -> Self {
        Self::Transient {
            resource: resource.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, MapperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for platform operations
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlOutcome, PlatformClient};
pub use node::{NodeId, NodeRecord, SubmissionKind};
pub use state::{CrawlState, EngineState};
pub use storage::{CheckpointStore, FileCheckpointStore};
