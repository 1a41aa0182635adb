use crate::node::NodeId;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Violations found when rebuilding a `CrawlState` from persisted parts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateInvariantError {
    #[error("frontier node '{0}' is missing from the visited set")]
    UnvisitedFrontierNode(NodeId),

    #[error("frontier contains '{0}' more than once")]
    DuplicateFrontierNode(NodeId),
}

/// The traversal state of a crawl
///
/// The frontier is a stack: the most recently discovered node is visited
/// first. The visited set holds every node that was ever pushed onto or popped
/// from the frontier, so a node is enqueued at most once per crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlState {
    frontier: Vec<NodeId>,
    visited: BTreeSet<NodeId>,
}

impl CrawlState {
    /// Creates a fresh state from the seed list
    ///
    /// Duplicate seeds are collapsed, keeping the first occurrence, and the
    /// visited set is exactly the seed set.
    pub fn seeded(seeds: impl IntoIterator<Item = NodeId>) -> Self {
        let mut state = Self::default();
        for seed in seeds {
            state.discover(seed);
        }
        state
    }

    /// Rebuilds a state from persisted parts, checking its invariants
    pub fn from_parts(
        frontier: Vec<NodeId>,
        visited: BTreeSet<NodeId>,
    ) -> Result<Self, StateInvariantError> {
        let mut seen = HashSet::with_capacity(frontier.len());
        for id in &frontier {
            if !visited.contains(id) {
                return Err(StateInvariantError::UnvisitedFrontierNode(id.clone()));
            }
            if !seen.insert(id) {
                return Err(StateInvariantError::DuplicateFrontierNode(id.clone()));
            }
        }

        Ok(Self { frontier, visited })
    }

    /// Removes and returns the next node to visit
    pub fn pop(&mut self) -> Option<NodeId> {
        self.frontier.pop()
    }

    /// Pushes a newly discovered node unless it was already seen
    ///
    /// Returns true if the node was enqueued.
    pub fn discover(&mut self, id: NodeId) -> bool {
        if self.visited.contains(&id) {
            return false;
        }
        self.visited.insert(id.clone());
        self.frontier.push(id);
        true
    }

    /// Puts a popped node back on top of the frontier
    ///
    /// Used when visiting the node faulted, so it is the first node retried on
    /// resume. Visited membership is never revoked.
    pub fn requeue(&mut self, id: NodeId) {
        debug_assert!(self.visited.contains(&id));
        debug_assert!(!self.frontier.contains(&id));
        self.visited.insert(id.clone());
        self.frontier.push(id);
    }

    /// Returns the frontier in stack order (last element is visited next)
    pub fn frontier(&self) -> &[NodeId] {
        &self.frontier
    }

    /// Returns the visited set
    pub fn visited(&self) -> &BTreeSet<NodeId> {
        &self.visited
    }

    /// Returns the node that would be popped next
    pub fn peek(&self) -> Option<&NodeId> {
        self.frontier.last()
    }

    /// Returns true if the node was ever enqueued or visited
    pub fn is_visited(&self, id: &NodeId) -> bool {
        self.visited.contains(id)
    }

    /// Returns true when there is nothing left to visit
    pub fn is_exhausted(&self) -> bool {
        self.frontier.is_empty()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> NodeId {
        NodeId::normalize(name).unwrap()
    }

    #[test]
    fn test_seeded_dedups_and_marks_visited() {
        let state = CrawlState::seeded(vec![id("pics"), id("funny"), id("Pics")]);
        assert_eq!(state.frontier(), &[id("pics"), id("funny")]);
        assert_eq!(state.visited_len(), 2);
        assert!(state.is_visited(&id("pics")));
    }

    #[test]
    fn test_stack_order() {
        let mut state = CrawlState::seeded(vec![id("a"), id("b")]);
        assert!(state.discover(id("c")));
        assert_eq!(state.pop(), Some(id("c")));
        assert_eq!(state.pop(), Some(id("b")));
        assert_eq!(state.pop(), Some(id("a")));
        assert_eq!(state.pop(), None);
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_discover_never_pushes_twice() {
        let mut state = CrawlState::seeded(vec![id("a")]);
        assert_eq!(state.pop(), Some(id("a")));

        // Popped nodes stay visited
        assert!(!state.discover(id("a")));
        assert!(state.discover(id("b")));
        assert!(!state.discover(id("b")));
        assert_eq!(state.frontier(), &[id("b")]);
    }

    #[test]
    fn test_requeue_goes_on_top() {
        let mut state = CrawlState::seeded(vec![id("a"), id("b")]);
        let popped = state.pop().unwrap();
        state.discover(id("c"));
        state.requeue(popped.clone());
        assert_eq!(state.peek(), Some(&popped));
        assert_eq!(state.frontier(), &[id("a"), id("c"), id("b")]);
        assert_eq!(state.visited_len(), 3);
    }

    #[test]
    fn test_from_parts_accepts_valid_state() {
        let visited = BTreeSet::from([id("a"), id("b"), id("c")]);
        let state = CrawlState::from_parts(vec![id("c"), id("a")], visited).unwrap();
        assert_eq!(state.peek(), Some(&id("a")));
    }

    #[test]
    fn test_from_parts_rejects_unvisited_frontier() {
        let visited = BTreeSet::from([id("a")]);
        let result = CrawlState::from_parts(vec![id("a"), id("b")], visited);
        assert_eq!(
            result,
            Err(StateInvariantError::UnvisitedFrontierNode(id("b")))
        );
    }

    #[test]
    fn test_from_parts_rejects_duplicates() {
        let visited = BTreeSet::from([id("a")]);
        let result = CrawlState::from_parts(vec![id("a"), id("a")], visited);
        assert_eq!(
            result,
            Err(StateInvariantError::DuplicateFrontierNode(id("a")))
        );
    }
}
