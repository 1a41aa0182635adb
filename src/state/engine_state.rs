//! Lifecycle states of a crawl engine
//!
//! This module defines the states a single crawl run moves through and the
//! transitions allowed between them.

use std::fmt;

/// Represents the current state of the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed, the loop has not started yet
    Idle,

    /// Visiting nodes
    Running,

    /// The frontier is empty and the final checkpoint is being written
    Draining,

    /// An unrecoverable fault occurred and state is being persisted
    Faulting,

    /// The run is over (exhausted, faulted or cancelled)
    Stopped,
}

impl EngineState {
    /// Returns true if the engine may move from this state to `to`
    pub fn can_transition_to(&self, to: EngineState) -> bool {
        matches!(
            (self, to),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Faulting)
                | (Self::Running, Self::Stopped)
                | (Self::Draining, Self::Stopped)
                | (Self::Faulting, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Faulting => "faulting",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(EngineState::Idle.can_transition_to(EngineState::Running));
        assert!(EngineState::Running.can_transition_to(EngineState::Draining));
        assert!(EngineState::Running.can_transition_to(EngineState::Faulting));
        assert!(EngineState::Running.can_transition_to(EngineState::Stopped));
        assert!(EngineState::Draining.can_transition_to(EngineState::Stopped));
        assert!(EngineState::Faulting.can_transition_to(EngineState::Stopped));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!EngineState::Idle.can_transition_to(EngineState::Faulting));
        assert!(!EngineState::Idle.can_transition_to(EngineState::Stopped));
        assert!(!EngineState::Draining.can_transition_to(EngineState::Running));
        assert!(!EngineState::Faulting.can_transition_to(EngineState::Running));
        assert!(!EngineState::Faulting.can_transition_to(EngineState::Draining));
    }

    #[test]
    fn test_stopped_is_final() {
        let all = [
            EngineState::Idle,
            EngineState::Running,
            EngineState::Draining,
            EngineState::Faulting,
            EngineState::Stopped,
        ];
        for state in all {
            assert!(!EngineState::Stopped.can_transition_to(state));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EngineState::Faulting), "faulting");
        assert_eq!(format!("{}", EngineState::Idle), "idle");
    }
}
