//! Explicit state machine driving one height through the pipeline
//! (spec.md §4.C). A plain enum, not a trait-object state pattern: the
//! state set is closed and small.

/// Phase of the current height's processing. `Stopped` is terminal and
/// only reached via cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum IngestPhase {
    Idle,
    Fetching,
    Deriving,
    Committing,
    Stopped,
}

impl IngestPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestPhase::Stopped)
    }
}
