//! Sidebar parser for extracting outbound edges
//!
//! This module scans a node's description text for:
//! - Direct node references (`/r/<name>`)
//! - Curated collection references (`user/<owner>/m/<name>`), which are
//!   expanded into their member nodes through the platform client

use crate::crawler::fetcher::PlatformClient;
use crate::node::{NodeId, MAX_NAME_LEN};
use crate::PlatformResult;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

static RE_NODE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/r/([0-9A-Za-z_]+)").unwrap());
static RE_COLLECTION_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:user|u)/([0-9A-Za-z_-]+)/m/([0-9A-Za-z_-]+)").unwrap()
});

/// A reference to a curated collection, with both parts lowercased
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionRef {
    pub owner: String,
    pub name: String,
}

/// Finds all direct node references in a description
///
/// Matches longer than the legal name length are truncated references and are
/// dropped rather than cut down to a different name.
///
/// # Example
///
/// ```
/// use subreddit_mapper::crawler::find_node_references;
///
/// let refs = find_node_references("Try /r/Statistics and /r/learnmath!");
/// let names: Vec<&str> = refs.iter().map(|id| id.as_str()).collect();
/// assert_eq!(names, vec!["learnmath", "statistics"]);
/// ```
pub fn find_node_references(description: &str) -> BTreeSet<NodeId> {
    RE_NODE_REF
        .captures_iter(description)
        .filter_map(|caps| {
            let raw = &caps[1];
            match NodeId::normalize(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    debug!("Ignoring node reference '{}': {}", raw, e);
                    None
                }
            }
        })
        .collect()
}

/// Finds all distinct collection references in a description
pub fn find_collection_references(description: &str) -> BTreeSet<CollectionRef> {
    RE_COLLECTION_REF
        .captures_iter(description)
        .filter_map(|caps| {
            let (owner, name) = (&caps[1], &caps[2]);
            if owner.len() > MAX_NAME_LEN || name.len() > MAX_NAME_LEN {
                debug!("Ignoring over-long collection reference {}/m/{}", owner, name);
                return None;
            }
            Some(CollectionRef {
                owner: owner.to_ascii_lowercase(),
                name: name.to_ascii_lowercase(),
            })
        })
        .collect()
}

/// Computes the outbound edges of a node from its description
///
/// # Steps
///
/// 1. Collect direct node references
/// 2. Expand every distinct collection reference into its members
/// 3. Remove the node itself
///
/// A failure to fetch a collection is returned to the caller unchanged.
pub async fn extract_edges<C>(
    client: &C,
    self_id: &NodeId,
    description: &str,
) -> PlatformResult<BTreeSet<NodeId>>
where
    C: PlatformClient + ?Sized,
{
    let mut edges = find_node_references(description);

    for collection in find_collection_references(description) {
        let members = client
            .fetch_collection_members(&collection.owner, &collection.name)
            .await?;
        debug!(
            "Collection {}/m/{} has {} members",
            collection.owner,
            collection.name,
            members.len()
        );

        for member in members {
            match NodeId::normalize(&member) {
                Ok(id) => {
                    edges.insert(id);
                }
                Err(e) => debug!("Ignoring collection member '{}': {}", member, e),
            }
        }
    }

    edges.remove(self_id);
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeAbout;
    use crate::PlatformError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeClient {
        collections: HashMap<(String, String), Vec<String>>,
        requested: Mutex<Vec<(String, String)>>,
    }

    impl FakeClient {
        fn with_collection(mut self, owner: &str, name: &str, members: &[&str]) -> Self {
            self.collections.insert(
                (owner.to_string(), name.to_string()),
                members.iter().map(|m| m.to_string()).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl PlatformClient for FakeClient {
        async fn fetch_node(&self, id: &NodeId) -> PlatformResult<NodeAbout> {
            Err(PlatformError::NotFound {
                resource: id.to_string(),
            })
        }

        async fn fetch_collection_members(
            &self,
            owner: &str,
            name: &str,
        ) -> PlatformResult<Vec<String>> {
            self.requested
                .lock()
                .unwrap()
                .push((owner.to_string(), name.to_string()));
            self.collections
                .get(&(owner.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| PlatformError::NotFound {
                    resource: format!("user/{}/m/{}", owner, name),
                })
        }
    }

    fn id(name: &str) -> NodeId {
        NodeId::normalize(name).unwrap()
    }

    fn ids(names: &[&str]) -> BTreeSet<NodeId> {
        names.iter().map(|n| id(n)).collect()
    }

    #[test]
    fn test_find_node_references() {
        let text = "Related: /r/Statistics, /r/statistics, [probability](/r/probability) \
                    and https://www.reddit.com/r/AskScience/wiki";
        assert_eq!(
            find_node_references(text),
            ids(&["statistics", "probability", "askscience"])
        );
    }

    #[test]
    fn test_over_long_reference_is_dropped() {
        let text = "/r/abcdefghijklmnopqrstuvwxyz and /r/ok";
        assert_eq!(find_node_references(text), ids(&["ok"]));
    }

    #[test]
    fn test_reference_without_leading_slash_is_ignored() {
        assert!(find_node_references("r/pics").is_empty());
        assert!(find_node_references("no references here").is_empty());
    }

    #[test]
    fn test_find_collection_references() {
        let text = "See /user/Some-One/m/Science and u/some-one/m/science, \
                    also https://reddit.com/user/other_user/m/art_stuff";
        let refs = find_collection_references(text);
        let pairs: Vec<(&str, &str)> = refs
            .iter()
            .map(|r| (r.owner.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(pairs, vec![("other_user", "art_stuff"), ("some-one", "science")]);
    }

    #[test]
    fn test_collection_reference_inside_word_is_ignored() {
        assert!(find_collection_references("superuser/bob/m/stuff").is_empty());
    }

    #[tokio::test]
    async fn test_extract_edges_excludes_self() {
        let client = FakeClient::default();
        let edges = extract_edges(&client, &id("mathematics"), "/r/statistics /r/Mathematics")
            .await
            .unwrap();
        assert_eq!(edges, ids(&["statistics"]));
    }

    #[tokio::test]
    async fn test_extract_edges_expands_collections() {
        let client = FakeClient::default()
            .with_collection("bob", "science", &["Physics", "chemistry", "biology"])
            .with_collection("alice", "empty", &[]);
        let text = "/r/biology plus /user/bob/m/science and /u/Bob/m/SCIENCE and /user/alice/m/empty";

        let edges = extract_edges(&client, &id("biology"), text).await.unwrap();

        assert_eq!(edges, ids(&["physics", "chemistry"]));
        assert_eq!(client.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_extract_edges_propagates_collection_failure() {
        let client = FakeClient::default();
        let result = extract_edges(&client, &id("pics"), "/user/ghost/m/gone").await;
        assert!(matches!(result, Err(PlatformError::NotFound { .. })));
    }
}
