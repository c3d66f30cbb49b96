//! Outcome of one `advance` call.

use crate::fixup::FixOutcome;

/// Whether `advance` found a trial to prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceStatus {
    /// The next trial of the sequence was prepared.
    Advanced,
    /// No later trial of the sequence exists; nothing was written.
    Exhausted,
}

impl AdvanceStatus {
    /// Numeric status as reported to trial runners: 0 on success.
    pub const fn code(self) -> i32 {
        match self {
            Self::Advanced => 0,
            Self::Exhausted => 1,
        }
    }
}

/// Per-sequence flags threaded through every `advance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceState {
    /// The last computed step hit the floor.
    pub at_minimum_step_size: bool,
    /// The last response was neither yes nor no.
    pub response_error: bool,
    /// A stopping rule fired; later trials are not executed.
    pub terminated: bool,
    /// Running turnpoint tally, used when the trial list has no counter field.
    pub turnpoints: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceOutcome {
    pub status: AdvanceStatus,
    /// Index of the prepared trial.
    pub next_index: Option<usize>,
    /// State written into the prepared trial.
    pub next_state: i64,
    /// `None` when fix-up was skipped (terminal state or exhausted list).
    pub fix: Option<FixOutcome>,
    pub stopped: bool,
    /// Trailing trials removed after termination.
    pub removed: usize,
    pub sequence: SequenceState,
}

impl AdvanceOutcome {
    pub(crate) const fn exhausted(sequence: SequenceState) -> Self {
        Self {
            status: AdvanceStatus::Exhausted,
            next_index: None,
            next_state: 0,
            fix: None,
            stopped: false,
            removed: 0,
            sequence,
        }
    }
}
