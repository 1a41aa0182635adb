//! Output module for crawl reports
//!
//! This module handles:
//! - Summarising an existing record stream and checkpoint
//! - Printing the summary for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, CheckpointSummary, CrawlStatistics};
