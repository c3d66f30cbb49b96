//! Parameter fix-up: the stimulus value and step divisor of the next trial.

use crate::procedure::Procedure;
use crate::step::StepSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Hold,
}

/// Step direction taken on the way into `state`.
pub const fn direction(procedure: Procedure, state: i64) -> Direction {
    match procedure {
        Procedure::NonAdaptive | Procedure::NonChanging => Direction::Hold,
        Procedure::Up1Down1 | Procedure::DelayedUp1Down1 => match state {
            1 | 3 => Direction::Up,
            2 | 4 => Direction::Down,
            _ => Direction::Hold,
        },
        Procedure::Up1Down2 | Procedure::Up1Down3 => match state {
            1 | 3 | 5 => Direction::Up,
            2 | 4 => Direction::Down,
            _ => Direction::Hold,
        },
    }
}

/// Divisor for the next trial. Unchanged when leaving the start state.
pub fn next_divisor(
    procedure: Procedure,
    step: &StepSize,
    current_state: i64,
    next_state: i64,
    divisor: f64,
    trial_counter: i64,
) -> f64 {
    if current_state == 0 {
        return divisor;
    }
    match procedure {
        Procedure::Up1Down1 | Procedure::Up1Down2 | Procedure::Up1Down3 => match next_state {
            1 | 2 => divisor + step.increment,
            3 | 4 => step.decrement(divisor),
            _ => divisor,
        },
        Procedure::DelayedUp1Down1 => match next_state {
            1 | 2 => step.increment.mul_add(trial_counter as f64, 1.0),
            _ => divisor,
        },
        Procedure::NonAdaptive | Procedure::NonChanging => divisor,
    }
}

/// What the controller knows about the transition being fixed up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixInput {
    pub current_state: i64,
    pub next_state: i64,
    /// Current trial's live parameter value.
    pub value: f64,
    /// Current trial's divisor.
    pub divisor: f64,
    /// Counter already written into the next trial.
    pub trial_counter: i64,
    pub limits: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// The procedure does not touch the parameter.
    Untouched,
    /// New value lies within range.
    Applied { value: f64, divisor: f64 },
    /// New value would leave the range; old value and current divisor kept.
    Rejected { value: f64, divisor: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub outcome: FixOutcome,
    pub signed_step: f64,
    /// Floor flag from the step computation; `None` when no step was computed.
    pub at_floor: Option<bool>,
}

/// `value + step`, accepted only within `limits` (inclusive).
pub fn apply(
    value: f64,
    signed_step: f64,
    new_divisor: f64,
    current_divisor: f64,
    limits: Option<(f64, f64)>,
) -> FixOutcome {
    let new = value + signed_step;
    match limits {
        Some((lo, hi)) if !(lo..=hi).contains(&new) => FixOutcome::Rejected {
            value,
            divisor: current_divisor,
        },
        _ => FixOutcome::Applied {
            value: new,
            divisor: new_divisor,
        },
    }
}

pub fn fix_parameter(procedure: Procedure, step: &StepSize, input: &FixInput) -> Fix {
    match procedure {
        Procedure::NonAdaptive => Fix {
            outcome: FixOutcome::Untouched,
            signed_step: 0.0,
            at_floor: None,
        },
        Procedure::NonChanging => Fix {
            outcome: apply(input.value, 0.0, input.divisor, input.divisor, input.limits),
            signed_step: 0.0,
            at_floor: None,
        },
        _ => {
            let divisor = next_divisor(
                procedure,
                step,
                input.current_state,
                input.next_state,
                input.divisor,
                input.trial_counter,
            );
            let dir = direction(procedure, input.next_state);
            let (signed_step, at_floor) = match dir {
                Direction::Hold => (0.0, None),
                Direction::Up | Direction::Down => {
                    let (magnitude, floor) = step.step(divisor);
                    let signed = if dir == Direction::Up {
                        step.upward_factor * magnitude
                    } else {
                        -magnitude
                    };
                    (signed, Some(floor))
                }
            };
            let outcome = apply(input.value, signed_step, divisor, input.divisor, input.limits);
            tracing::debug!(
                procedure = procedure.name(),
                next_state = input.next_state,
                divisor,
                signed_step,
                ?outcome,
                "parameter fix-up"
            );
            Fix {
                outcome,
                signed_step,
                at_floor,
            }
        }
    }
}
