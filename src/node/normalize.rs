use crate::NodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest legal subreddit name
pub const MAX_NAME_LEN: usize = 21;

/// A normalized subreddit name
///
/// Equality, ordering and hashing are defined on the normalized form, so two
/// raw names that normalize to the same `NodeId` denote the same node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Normalizes a raw subreddit name
    ///
    /// # Normalization Steps
    ///
    /// 1. Trim surrounding whitespace
    /// 2. Drop non-ASCII characters (platform names are ASCII)
    /// 3. Lowercase
    /// 4. Reject anything outside `[a-z0-9_]` or longer than 21 characters
    ///
    /// # Examples
    ///
    /// ```
    /// use subreddit_mapper::node::NodeId;
    ///
    /// let id = NodeId::normalize("AskScience").unwrap();
    /// assert_eq!(id.as_str(), "askscience");
    /// assert!(NodeId::normalize("no spaces").is_err());
    /// ```
    pub fn normalize(raw: &str) -> Result<Self, NodeError> {
        let name: String = raw
            .trim()
            .chars()
            .filter(char::is_ascii)
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if name.is_empty() {
            return Err(NodeError::Empty);
        }

        let illegal = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'));
        if let Some(ch) = illegal {
            return Err(NodeError::IllegalCharacter { name, ch });
        }

        if name.len() > MAX_NAME_LEN {
            return Err(NodeError::TooLong {
                name,
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self(name))
    }

    /// Returns the normalized name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::normalize(&raw)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
