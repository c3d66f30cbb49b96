//! Fixed state-transition tables, one per procedure.
//!
//! Rows are indexed by the non-negative state, columns are `[yes, no]`.
//! Tables never hold negative states; termination is applied by the caller.

use crate::procedure::Procedure;

const SINGLE: &[[i64; 2]] = &[[0, 0]];

const UP1_DOWN1: &[[i64; 2]] = &[[4, 3], [2, 3], [4, 1], [2, 3], [4, 1]];

const UP1_DOWN2: &[[i64; 2]] = &[
    [4, 3],
    [6, 3],
    [7, 1],
    [6, 3],
    [7, 1],
    [6, 3],
    [2, 5],
    [4, 1],
];

const UP1_DOWN3: &[[i64; 2]] = &[
    [4, 3],
    [6, 3],
    [8, 1],
    [6, 3],
    [8, 1],
    [6, 3],
    [7, 5],
    [2, 1],
    [9, 1],
    [4, 1],
];

/// A response already resolved to one of the two table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub state: i64,
    /// The requested row did not exist and row 0 was used instead.
    pub illegal: bool,
}

pub fn table(procedure: Procedure) -> &'static [[i64; 2]] {
    match procedure {
        Procedure::NonAdaptive | Procedure::NonChanging => SINGLE,
        Procedure::Up1Down1 | Procedure::DelayedUp1Down1 => UP1_DOWN1,
        Procedure::Up1Down2 => UP1_DOWN2,
        Procedure::Up1Down3 => UP1_DOWN3,
    }
}

pub fn lookup(procedure: Procedure, state: i64, answer: Answer) -> Lookup {
    let rows = table(procedure);
    let col = match answer {
        Answer::Yes => 0,
        Answer::No => 1,
    };
    match usize::try_from(state).ok().and_then(|i| rows.get(i)) {
        Some(row) => Lookup {
            state: row[col],
            illegal: false,
        },
        None => Lookup {
            state: rows[0][col],
            illegal: true,
        },
    }
}

/// Reversal states: a change of direction happened on the way into them.
pub const fn is_turnpoint(state: i64) -> bool {
    matches!(state.unsigned_abs(), 1 | 2)
}
