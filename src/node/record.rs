//! Visit records and their line encoding
//!
//! A `NodeRecord` is created once per node, at the moment the node is fetched
//! and its sidebar parsed, and is written to the output stream exactly once.

use crate::node::NodeId;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Field separator in an encoded record line
const FIELD_SEP: &str = ",";

/// Separator between outbound edges inside the last field
const EDGE_SEP: &str = ";";

/// The kind of submissions a subreddit accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum SubmissionKind {
    /// Text (self) posts only
    #[serde(rename = "self", alias = "text")]
    Text,

    /// Link posts only
    #[serde(rename = "link")]
    Link,

    /// Both text and link posts
    #[serde(rename = "any")]
    Any,
}

impl SubmissionKind {
    /// Converts the kind to its record string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Any => "any",
        }
    }

    /// Parses a kind from its record string representation
    ///
    /// Returns None if the string doesn't match any known kind.
    pub fn from_record_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "link" => Some(Self::Link),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// Returns all submission kinds
    pub fn all() -> [Self; 3] {
        [Self::Text, Self::Link, Self::Any]
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a node as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAbout {
    pub subscribers: u64,
    pub is_restricted: bool,
    pub submission_kind: SubmissionKind,
    /// Sidebar text, scanned for outbound references
    pub description: String,
}

/// The result of visiting a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub subscribers: u64,
    pub is_restricted: bool,
    pub submission_kind: SubmissionKind,
    pub outbound_edges: BTreeSet<NodeId>,
}

/// Errors raised when an output line cannot be decoded
#[derive(Debug, Error)]
pub enum RecordDecodeError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid subscriber count '{0}'")]
    Subscribers(String),

    #[error("invalid restricted flag '{0}'")]
    Restricted(String),

    #[error("invalid submission kind '{0}'")]
    Kind(String),

    #[error("invalid node name: {0}")]
    Node(#[from] crate::NodeError),
}

impl NodeRecord {
    /// Builds a record from fetched attributes and extracted edges
    pub fn new(id: NodeId, about: &NodeAbout, outbound_edges: BTreeSet<NodeId>) -> Self {
        Self {
            id,
            subscribers: about.subscribers,
            is_restricted: about.is_restricted,
            submission_kind: about.submission_kind,
            outbound_edges,
        }
    }

    /// Encodes the record as a single output line (without the newline)
    ///
    /// Format: `name,subscribers,restricted,kind,edge1;edge2;...`
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::BTreeSet;
    /// use subreddit_mapper::node::{NodeId, NodeRecord, SubmissionKind};
    ///
    /// let record = NodeRecord {
    ///     id: NodeId::normalize("mathematics").unwrap(),
    ///     subscribers: 500000,
    ///     is_restricted: false,
    ///     submission_kind: SubmissionKind::Any,
    ///     outbound_edges: BTreeSet::from([NodeId::normalize("statistics").unwrap()]),
    /// };
    /// assert_eq!(record.encode_line(), "mathematics,500000,false,any,statistics");
    /// ```
    pub fn encode_line(&self) -> String {
        let edges: Vec<&str> = self.outbound_edges.iter().map(NodeId::as_str).collect();
        format!(
            "{id}{sep}{subs}{sep}{restricted}{sep}{kind}{sep}{edges}",
            id = self.id,
            subs = self.subscribers,
            restricted = self.is_restricted,
            kind = self.submission_kind,
            edges = edges.join(EDGE_SEP),
            sep = FIELD_SEP,
        )
    }

    /// Decodes a line produced by [`NodeRecord::encode_line`]
    pub fn decode_line(line: &str) -> Result<Self, RecordDecodeError> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(FIELD_SEP).collect();
        if fields.len() != 5 {
            return Err(RecordDecodeError::FieldCount(fields.len()));
        }

        let id = NodeId::normalize(fields[0])?;
        let subscribers = fields[1]
            .parse()
            .map_err(|_| RecordDecodeError::Subscribers(fields[1].to_string()))?;
        let is_restricted = fields[2]
            .parse()
            .map_err(|_| RecordDecodeError::Restricted(fields[2].to_string()))?;
        let submission_kind = SubmissionKind::from_record_str(fields[3])
            .ok_or_else(|| RecordDecodeError::Kind(fields[3].to_string()))?;

        let outbound_edges = fields[4]
            .split(EDGE_SEP)
            .filter(|s| !s.is_empty())
            .map(NodeId::normalize)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            id,
            subscribers,
            is_restricted,
            submission_kind,
            outbound_edges,
        })
    }
}
