use thiserror::Error;

/// Engine-level errors.
///
/// Most of these are non-fatal: the controller records them in its
/// diagnostics list, logs them and carries on with a defined fallback.
/// Only the caller errors (`TrialIndex`, `ForeignTrial`, `NoTrials`) are
/// returned through `Result`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StaircaseError {
    #[error("unknown {what} {value}; falling back to {fallback}")]
    UnknownCode {
        what: &'static str,
        value: String,
        fallback: &'static str,
    },
    #[error("illegal state {state} for procedure {procedure}; using state 0")]
    IllegalState { procedure: &'static str, state: i64 },
    #[error("malformed response {response} in sequence {sequence_id}")]
    MalformedResponse { sequence_id: i64, response: i64 },
    #[error("sequence {0} has no further trials")]
    SequenceExhausted(i64),
    #[error("trial list has no {field} field for sequence {sequence_id}")]
    MissingField {
        sequence_id: i64,
        field: &'static str,
    },
    #[error("solver failed: {0}")]
    Solver(String),
    #[error("trial index {index} out of range for list of {len}")]
    TrialIndex { index: usize, len: usize },
    #[error("trial at index {index} belongs to sequence {found}, not {expected}")]
    ForeignTrial {
        index: usize,
        expected: i64,
        found: i64,
    },
    #[error("trial list holds no trials of sequence {0}")]
    NoTrials(i64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid sequence id {0}; ids start at 1")]
    InvalidId(i64),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Errors raised by the built-in numerical collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("start point is empty")]
    EmptyStart,
    #[error("start point has non-finite coordinates")]
    NonFiniteStart,
    #[error("stimulus and response vectors differ in length ({x} vs {r})")]
    LengthMismatch { x: usize, r: usize },
    #[error("no observations to fit")]
    NoData,
    #[error("minimizer failed: {0}")]
    Backend(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
