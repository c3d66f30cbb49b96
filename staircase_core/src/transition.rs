//! Response resolution and state advance.

use crate::procedure::{Procedure, Response, ResponseCodes, StoppingRule};
use crate::table::{self, Answer};

/// Result of advancing a state by one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: i64,
    /// The response was neither yes nor no (nor an honored stop key).
    pub response_error: bool,
    /// The current state had no table row; row 0 was used.
    pub illegal_state: bool,
}

impl Transition {
    const fn hold(state: i64, response_error: bool) -> Self {
        Self {
            state,
            response_error,
            illegal_state: false,
        }
    }
}

pub fn next_state(
    procedure: Procedure,
    rule: StoppingRule,
    codes: &ResponseCodes,
    state: i64,
    response: i64,
) -> Transition {
    if state < 0 {
        return Transition::hold(state, false);
    }
    let answer = match codes.classify(response) {
        Response::Stop if rule == StoppingRule::StopKeyResponse => {
            return Transition::hold(-state, false);
        }
        Response::Yes => Answer::Yes,
        Response::No => Answer::No,
        Response::Stop | Response::Invalid(_) => return Transition::hold(state, true),
    };
    let l = table::lookup(procedure, state, answer);
    tracing::trace!(
        procedure = procedure.name(),
        from = state,
        to = l.state,
        ?answer,
        "state transition"
    );
    Transition {
        state: l.state,
        response_error: false,
        illegal_state: l.illegal,
    }
}
