use thiserror::Error;

use crate::models::OutcomeResult;

use super::SessionPhase;

/// Why an event was refused. The state it was applied to is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("`{event}` is not accepted during {phase}")]
    InvalidEvent {
        phase: SessionPhase,
        event: &'static str,
    },

    #[error("session has no drills")]
    EmptySession,

    #[error("no drill at position {0}")]
    MissingDrill(usize),

    #[error("rpe {0} is outside 1-10")]
    RpeOutOfRange(u8),

    #[error("achieved value `{0}` is not a non-negative whole number")]
    InvalidAchievedValue(String),

    #[error("`{0}` cannot be declared as feedback")]
    UndeclarableOutcome(OutcomeResult),

    #[error("drill {position} already has an outcome")]
    DuplicateOutcome { position: usize },

    #[error("drill {position} recorded before drill {expected}")]
    OutOfOrder { position: usize, expected: usize },

    #[error("session is closed")]
    SessionClosed,
}
