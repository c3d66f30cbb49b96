//! Stopping rules.

use crate::procedure::{Procedure, StoppingRule};
use crate::table::is_turnpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopDecision {
    pub stop: bool,
    /// The next trial's state must be negated to mark termination.
    pub negate: bool,
    /// Turnpoint count to carry into the next trial; `None` when the rule
    /// does not count turnpoints.
    pub turnpoints: Option<i64>,
}

/// Decide termination from the post-transition state.
///
/// `prior_turnpoints` is the count carried by the current trial.
pub fn should_stop(
    rule: StoppingRule,
    procedure: Procedure,
    next_state: i64,
    at_minimum_step_size: bool,
    prior_turnpoints: i64,
    turnpoint_limit: u32,
) -> StopDecision {
    let counting = rule.counts_turnpoints();
    let carried = counting.then_some(prior_turnpoints);
    if rule == StoppingRule::DontStop {
        return StopDecision {
            stop: false,
            negate: false,
            turnpoints: carried,
        };
    }
    if next_state < 0 {
        return StopDecision {
            stop: true,
            negate: false,
            turnpoints: carried,
        };
    }
    if !counting {
        return StopDecision {
            stop: false,
            negate: false,
            turnpoints: None,
        };
    }

    let counts_now = rule == StoppingRule::Turnpoints || at_minimum_step_size;
    let count = if counts_now && is_turnpoint(next_state) {
        prior_turnpoints + 1
    } else {
        prior_turnpoints
    };
    let reached = count >= i64::from(turnpoint_limit) && procedure != Procedure::NonChanging;
    StopDecision {
        stop: reached,
        negate: reached,
        turnpoints: Some(count),
    }
}
