//! Statistics generation from crawl output
//!
//! This module provides functionality for summarising an existing record
//! stream and checkpoint, used by the `--stats` mode.

use crate::node::{NodeId, NodeRecord, SubmissionKind};
use crate::storage::{read_checkpoint, StorageError};
use crate::MapperError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Number of nodes listed in the subscriber ranking
const TOP_NODES: usize = 10;

/// Checkpoint figures included in the statistics
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub saved_at: DateTime<Utc>,
    pub output_cursor: u64,
    pub frontier: usize,
    pub visited: usize,
}

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of records in the output stream
    pub total_records: u64,

    /// Count of records by submission kind
    pub records_by_kind: HashMap<SubmissionKind, u64>,

    /// Records flagged as restricted
    pub restricted: u64,

    /// Sum of outbound edge counts
    pub total_edges: u64,

    /// Distinct nodes referenced by any edge
    pub unique_targets: u64,

    /// Nodes that appear in more than one record
    pub duplicate_records: u64,

    /// Lines that could not be decoded
    pub malformed_lines: u64,

    /// Largest nodes by subscriber count, descending
    pub top_by_subscribers: Vec<(NodeId, u64)>,

    /// Present when a checkpoint exists
    pub checkpoint: Option<CheckpointSummary>,
}

/// Loads statistics from the record stream and checkpoint
///
/// # Arguments
///
/// * `records_path` - The output record stream
/// * `checkpoint_path` - The checkpoint file; may be absent
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(MapperError)` - The record stream is missing or unreadable, or the
///   checkpoint is corrupt
pub fn load_statistics(
    records_path: &Path,
    checkpoint_path: &Path,
) -> Result<CrawlStatistics, MapperError> {
    if !records_path.exists() {
        return Err(StorageError::NotFound(records_path.to_path_buf()).into());
    }

    let mut stats = CrawlStatistics {
        total_records: 0,
        records_by_kind: HashMap::new(),
        restricted: 0,
        total_edges: 0,
        unique_targets: 0,
        duplicate_records: 0,
        malformed_lines: 0,
        top_by_subscribers: Vec::new(),
        checkpoint: None,
    };

    let mut seen = HashSet::new();
    let mut targets = HashSet::new();
    let mut ranking = Vec::new();

    let reader = BufReader::new(File::open(records_path)?);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let record = match NodeRecord::decode_line(&line) {
            Ok(record) => record,
            Err(e) => {
                debug!("Line {} is malformed: {}", index + 1, e);
                stats.malformed_lines += 1;
                continue;
            }
        };

        stats.total_records += 1;
        *stats.records_by_kind.entry(record.submission_kind).or_insert(0) += 1;
        if record.is_restricted {
            stats.restricted += 1;
        }
        stats.total_edges += record.outbound_edges.len() as u64;
        if !seen.insert(record.id.clone()) {
            stats.duplicate_records += 1;
        }
        ranking.push((record.id, record.subscribers));
        targets.extend(record.outbound_edges);
    }

    ranking.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranking.truncate(TOP_NODES);
    stats.top_by_subscribers = ranking;
    stats.unique_targets = targets.len() as u64;

    if checkpoint_path.exists() {
        let snapshot = read_checkpoint(checkpoint_path)?;
        stats.checkpoint = Some(CheckpointSummary {
            saved_at: snapshot.saved_at,
            output_cursor: snapshot.output_cursor,
            frontier: snapshot.state.frontier_len(),
            visited: snapshot.state.visited_len(),
        });
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Nodes recorded: {}", stats.total_records);
    println!("  Edges recorded: {}", stats.total_edges);
    println!("  Distinct edge targets: {}", stats.unique_targets);
    let average = if stats.total_records > 0 {
        stats.total_edges as f64 / stats.total_records as f64
    } else {
        0.0
    };
    println!("  Average out-degree: {:.2}", average);
    println!();

    println!("Nodes by Submission Kind:");
    for kind in SubmissionKind::all() {
        let count = stats.records_by_kind.get(&kind).copied().unwrap_or(0);
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
    println!("  restricted: {}", stats.restricted);
    println!();

    if !stats.top_by_subscribers.is_empty() {
        println!("Top Nodes by Subscribers:");
        for (id, subscribers) in &stats.top_by_subscribers {
            println!("  {:<21} {}", id, subscribers);
        }
        println!();
    }

    if stats.duplicate_records > 0 || stats.malformed_lines > 0 {
        println!("Integrity:");
        println!("  Duplicate records: {}", stats.duplicate_records);
        println!("  Malformed lines: {}", stats.malformed_lines);
        println!();
    }

    match &stats.checkpoint {
        Some(checkpoint) => {
            println!("Checkpoint:");
            println!("  Saved at: {}", checkpoint.saved_at.to_rfc3339());
            println!("  Frontier: {}", checkpoint.frontier);
            println!("  Visited: {}", checkpoint.visited);
            println!("  Output cursor: {} bytes", checkpoint.output_cursor);
        }
        None => println!("Checkpoint: none"),
    }
}
