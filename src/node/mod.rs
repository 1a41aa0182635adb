//! Node identity and visit records
//!
//! A node is a subreddit. This module defines the single notion of node
//! sameness used everywhere in the crawler (`NodeId`) and the record produced
//! when a node is visited (`NodeRecord`).

mod normalize;
mod record;

pub use normalize::{NodeId, MAX_NAME_LEN};
pub use record::{NodeAbout, NodeRecord, RecordDecodeError, SubmissionKind};
