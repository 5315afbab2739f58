//! Presentation-boundary hooks for a chat turn.

use std::fmt;

/// Phase of a single chat turn.
///
/// `Idle -> AwaitingCompletion -> Streaming -> Settled | Failed -> Idle`.
/// A turn may also fail straight from `AwaitingCompletion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingCompletion,
    Streaming,
    Settled,
    Failed,
}

impl TurnPhase {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: TurnPhase) -> bool {
        use TurnPhase::*;
        matches!(
            (self, next),
            (Idle, AwaitingCompletion)
                | (AwaitingCompletion, Streaming)
                | (AwaitingCompletion, Failed)
                | (Streaming, Settled)
                | (Streaming, Failed)
                | (Settled, Idle)
                | (Failed, Idle)
        )
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::Idle => write!(f, "idle"),
            TurnPhase::AwaitingCompletion => write!(f, "awaiting_completion"),
            TurnPhase::Streaming => write!(f, "streaming"),
            TurnPhase::Settled => write!(f, "settled"),
            TurnPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Receives live progress of a turn.
///
/// Implemented by the presentation layer. Fragments arrive in order and only
/// ever extend the reply; nothing already delivered is rewritten.
pub trait TurnObserver {
    /// Called on every phase transition.
    fn on_phase(&mut self, _phase: TurnPhase) {}

    /// Called for each text fragment, in arrival order.
    fn on_fragment(&mut self, fragment: &str);
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl TurnObserver for SilentObserver {
    fn on_fragment(&mut self, _fragment: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            TurnPhase::Idle,
            TurnPhase::AwaitingCompletion,
            TurnPhase::Streaming,
            TurnPhase::Settled,
            TurnPhase::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failure_transitions() {
        assert!(TurnPhase::AwaitingCompletion.can_transition_to(TurnPhase::Failed));
        assert!(TurnPhase::Streaming.can_transition_to(TurnPhase::Failed));
        assert!(TurnPhase::Failed.can_transition_to(TurnPhase::Idle));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!TurnPhase::Idle.can_transition_to(TurnPhase::Streaming));
        assert!(!TurnPhase::Idle.can_transition_to(TurnPhase::Settled));
        assert!(!TurnPhase::AwaitingCompletion.can_transition_to(TurnPhase::Settled));
        assert!(!TurnPhase::Settled.can_transition_to(TurnPhase::Failed));
        assert!(!TurnPhase::Failed.can_transition_to(TurnPhase::Streaming));
    }
}
