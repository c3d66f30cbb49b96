use rstest::rstest;
use staircase_core::{
    AdvanceStatus, FixOutcome, Procedure, SequenceController, StaircaseError, StepSize,
    StoppingRule, TrialList, TrialRecord,
};
use staircase_traits::MemorySink;

const YES: i64 = 1;
const NO: i64 = 2;
const STOP: i64 = 27;

fn controller(procedure: Procedure, rule: StoppingRule) -> SequenceController {
    SequenceController::builder(1)
        .with_procedure(procedure)
        .with_stopping_rule(rule)
        .build()
        .expect("build")
}

fn list(n: usize, value: f64) -> Vec<TrialRecord> {
    (0..n).map(|_| TrialRecord::new(1, value, 1.0)).collect()
}

/// Answer trial `i` and advance from it.
fn answer(
    c: &mut SequenceController,
    trials: &mut Vec<TrialRecord>,
    i: usize,
    response: i64,
) -> staircase_core::AdvanceOutcome {
    trials[i].response = response;
    c.advance(trials, i).expect("advance")
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[rstest]
fn up1_down1_walkthrough() {
    let mut c = controller(Procedure::Up1Down1, StoppingRule::Turnpoints);
    let mut trials = list(6, 5.0);

    let o = answer(&mut c, &mut trials, 0, YES);
    assert_eq!(o.status, AdvanceStatus::Advanced);
    assert_eq!(o.next_index, Some(1));
    assert_eq!(trials[1].state, 4);
    assert_eq!(trials[1].trial_counter, 2);
    assert!(approx(trials[1].parameter_value, 4.0));

    answer(&mut c, &mut trials, 1, YES);
    assert_eq!(trials[2].state, 4);
    assert!(approx(trials[2].parameter_value, 3.0));

    // reversal upward: divisor 1 -> 2, step 0.5
    answer(&mut c, &mut trials, 2, NO);
    assert_eq!(trials[3].state, 1);
    assert!(approx(trials[3].step_divisor, 2.0));
    assert!(approx(trials[3].parameter_value, 3.5));
    assert_eq!(trials[3].turnpoint_counter, Some(1));

    // reversal downward: divisor 2 -> 3
    answer(&mut c, &mut trials, 3, YES);
    assert_eq!(trials[4].state, 2);
    assert!(approx(trials[4].step_divisor, 3.0));
    assert!(approx(trials[4].parameter_value, 3.5 - 1.0 / 3.0));
    assert_eq!(trials[4].turnpoint_counter, Some(2));
    assert!(c.diagnostics().is_empty());
}

#[rstest]
fn non_adaptive_never_moves_parameter() {
    let mut c = controller(Procedure::NonAdaptive, StoppingRule::Turnpoints);
    let mut trials = list(5, 2.5);
    for (i, r) in [YES, NO, 99, STOP].into_iter().enumerate() {
        answer(&mut c, &mut trials, i, r);
    }
    for t in &trials {
        assert_eq!(t.state, 0);
        assert_eq!(t.parameter_value, 2.5);
        assert_eq!(t.step_divisor, 1.0);
        assert!(c.exec_trial(t));
    }
    assert!(c.exec_trial(&TrialRecord::new(1, 0.0, 1.0).with_state(-3)));
}

#[rstest]
fn range_violation_keeps_value_and_current_divisor() {
    let mut c = SequenceController::builder(1)
        .with_procedure(Procedure::Up1Down1)
        .with_stopping_rule(StoppingRule::DontStop)
        .with_step(StepSize {
            base: 2.0,
            ..StepSize::default()
        })
        .with_limits(0.0, 9.0)
        .build()
        .expect("build");
    let mut trials = list(4, 10.0);
    trials[0].state = 4;

    // 4/no -> 1: divisor would become 2, step +1, 11 > 9
    let o = answer(&mut c, &mut trials, 0, NO);
    assert_eq!(
        o.fix,
        Some(FixOutcome::Rejected {
            value: 10.0,
            divisor: 1.0
        })
    );
    assert_eq!(trials[1].state, 4, "state reverted to the current one");
    assert_eq!(trials[1].parameter_value, 10.0);
    assert_eq!(trials[1].step_divisor, 1.0);
}

#[rstest]
fn range_revert_repeats_the_same_transition() {
    let mut c = SequenceController::builder(1)
        .with_procedure(Procedure::Up1Down1)
        .with_stopping_rule(StoppingRule::DontStop)
        .with_step(StepSize {
            base: 2.0,
            ..StepSize::default()
        })
        .with_limits(0.0, 9.0)
        .build()
        .expect("build");
    let mut trials = list(6, 9.0);
    for i in 0..5 {
        answer(&mut c, &mut trials, i, NO);
    }
    // first step 0/no -> 3 would reach 11; the sequence stays put forever
    for t in &trials {
        assert_eq!(t.state, 0);
        assert_eq!(t.parameter_value, 9.0);
    }
}

#[rstest]
fn stop_key_terminates_and_prunes() {
    let mut c = controller(Procedure::Up1Down1, StoppingRule::StopKeyResponse);
    let mut trials = list(5, 5.0);
    answer(&mut c, &mut trials, 0, YES);
    let o = answer(&mut c, &mut trials, 1, STOP);
    assert!(o.stopped);
    assert_eq!(o.removed, 2);
    assert_eq!(trials.len(), 3);
    assert_eq!(trials[2].state, -4);
    assert!(!c.exec_trial(&trials[2]));
    assert!(c.state().terminated);
}

#[rstest]
fn turnpoint_limit_negates_next_state() {
    let mut c = SequenceController::builder(1)
        .with_procedure(Procedure::Up1Down1)
        .with_stopping_rule(StoppingRule::Turnpoints)
        .with_turnpoint_limit(2)
        .build()
        .expect("build");
    let mut trials = list(10, 5.0);
    answer(&mut c, &mut trials, 0, YES); // -> 4
    answer(&mut c, &mut trials, 1, NO); // -> 1, first turnpoint
    let o = answer(&mut c, &mut trials, 2, YES); // -> 2, second turnpoint
    assert!(o.stopped);
    assert_eq!(o.next_state, -2);
    assert_eq!(trials[3].state, -2);
    assert_eq!(trials[3].turnpoint_counter, Some(2));
    assert_eq!(trials.len(), 4);
}

#[rstest]
fn trailing_trials_are_kept_when_configured() {
    let mut c = SequenceController::builder(1)
        .with_stopping_rule(StoppingRule::StopKeyResponse)
        .with_remove_trailing_trials(false)
        .build()
        .expect("build");
    let mut trials = list(5, 5.0);
    answer(&mut c, &mut trials, 0, YES);
    answer(&mut c, &mut trials, 1, STOP);
    assert_eq!(trials.len(), 5);
    assert!(!c.exec_trial(&trials[3]), "terminated sequence runs no more trials");
}

#[rstest]
fn last_trial_reports_exhaustion() {
    let mut c = controller(Procedure::Up1Down1, StoppingRule::Turnpoints);
    let mut trials = list(1, 5.0);
    let o = answer(&mut c, &mut trials, 0, YES);
    assert_eq!(o.status, AdvanceStatus::Exhausted);
    assert_eq!(o.status.code(), 1);
    assert_eq!(c.diagnostics(), &[StaircaseError::SequenceExhausted(1)]);
}

#[rstest]
fn malformed_response_holds_state_and_stimulus() {
    let mut c = controller(Procedure::Up1Down1, StoppingRule::Turnpoints);
    let mut trials = list(3, 5.0);
    answer(&mut c, &mut trials, 0, YES);
    let o = answer(&mut c, &mut trials, 1, 99);
    assert!(o.sequence.response_error);
    assert_eq!(trials[2].state, 4);
    assert_eq!(trials[2].parameter_value, 4.0);
    assert!(matches!(
        c.diagnostics(),
        [StaircaseError::MalformedResponse { response: 99, .. }]
    ));
}

#[rstest]
fn caller_errors_are_returned() {
    let mut c = controller(Procedure::Up1Down1, StoppingRule::Turnpoints);
    let mut trials = vec![TrialRecord::new(2, 1.0, 1.0)];
    let err = c.advance(&mut trials, 0).expect_err("foreign trial");
    assert!(matches!(
        err.downcast_ref::<StaircaseError>(),
        Some(StaircaseError::ForeignTrial { found: 2, .. })
    ));
    let err = c.advance(&mut trials, 7).expect_err("bad index");
    assert!(matches!(
        err.downcast_ref::<StaircaseError>(),
        Some(StaircaseError::TrialIndex { index: 7, len: 1 })
    ));
}

#[rstest]
fn missing_counter_field_falls_back_to_tally() {
    let mut c = SequenceController::builder(1)
        .with_turnpoint_limit(2)
        .build()
        .expect("build");
    let mut trials: Vec<TrialRecord> = list(8, 5.0)
        .into_iter()
        .map(TrialRecord::without_turnpoint_counter)
        .collect();
    answer(&mut c, &mut trials, 0, YES);
    answer(&mut c, &mut trials, 1, NO);
    let o = answer(&mut c, &mut trials, 2, YES);
    assert!(o.stopped);
    assert_eq!(o.sequence.turnpoints, 2);
    let missing = c
        .diagnostics()
        .iter()
        .filter(|e| matches!(e, StaircaseError::MissingField { field: "turnpoint_counter", .. }))
        .count();
    assert_eq!(missing, 1);
}

#[rstest]
fn protocol_lines_go_to_the_sink() {
    let sink = MemorySink::new();
    let mut c = SequenceController::builder(1)
        .with_protocol_sink(Box::new(sink.clone()))
        .build()
        .expect("build");
    let mut trials = list(3, 5.0);
    answer(&mut c, &mut trials, 0, YES);
    answer(&mut c, &mut trials, 1, YES);
    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("seq=1 proc=up1_down1 rule=turnpoints trial=2 state=4"));
    assert!(lines[1].contains("intensity=3"));
}

#[rstest]
fn up1_down2_all_yes_alternates_between_four_and_seven() {
    let mut c = controller(Procedure::Up1Down2, StoppingRule::DontStop);
    let mut trials = list(20, 50.0);
    for i in 0..19 {
        answer(&mut c, &mut trials, i, YES);
    }
    let states: Vec<i64> = trials.iter().map(|t| t.state).collect();
    let expected: Vec<i64> = std::iter::once(0)
        .chain([4, 7].into_iter().cycle().take(19))
        .collect();
    assert_eq!(states, expected);
    assert!(c.diagnostics().is_empty());
}

#[rstest]
fn up1_down2_alternating_follows_table() {
    let mut c = controller(Procedure::Up1Down2, StoppingRule::DontStop);
    let mut trials = list(20, 50.0);
    for i in 0..19 {
        answer(&mut c, &mut trials, i, if i % 2 == 0 { YES } else { NO });
    }
    let states: Vec<i64> = trials.iter().map(|t| t.state).collect();
    let expected: Vec<i64> = [0, 4, 1, 6]
        .into_iter()
        .chain([5, 6].into_iter().cycle().take(16))
        .collect();
    assert_eq!(states, expected);
    assert!(
        !c.diagnostics()
            .iter()
            .any(|e| matches!(e, StaircaseError::IllegalState { .. }))
    );
}

#[rstest]
fn non_changing_copies_live_value() {
    let mut c = controller(Procedure::NonChanging, StoppingRule::Turnpoints);
    let mut trials = list(3, 1.0);
    trials[0].parameter_value = 7.5;
    answer(&mut c, &mut trials, 0, NO);
    assert_eq!(trials[1].state, 0);
    assert_eq!(trials[1].parameter_value, 7.5);
}

#[rstest]
fn counters_increase_within_interleaved_sequences() {
    let mut one = controller(Procedure::Up1Down1, StoppingRule::DontStop);
    let mut two = SequenceController::builder(2).build().expect("build");
    let mut trials: Vec<TrialRecord> = (0..8)
        .map(|i| TrialRecord::new(1 + (i % 2), 5.0, 1.0))
        .collect();
    for i in 0..6 {
        trials[i].response = YES;
        let c = if trials[i].sequence_id == 1 { &mut one } else { &mut two };
        c.advance(&mut trials, i).expect("advance");
    }
    let seq1: Vec<i64> = trials
        .iter()
        .filter(|t| t.sequence_id == 1)
        .map(|t| t.trial_counter)
        .collect();
    assert_eq!(seq1, vec![1, 2, 3, 4]);
    assert_eq!(trials.indices_of_sequence(2), vec![1, 3, 5, 7]);
}

#[rstest]
fn turnpoints_count_only_once_the_step_is_at_its_floor() {
    let step = StepSize {
        floor: 0.4,
        ..StepSize::default()
    };
    let mut c = SequenceController::builder(1)
        .with_procedure(Procedure::Up1Down1)
        .with_stopping_rule(StoppingRule::TurnpointsAtMinimum)
        .with_step(step)
        .with_turnpoint_limit(2)
        .build()
        .expect("build");
    let mut trials = list(10, 5.0);

    answer(&mut c, &mut trials, 0, YES); // -> 4, step 1
    let o = answer(&mut c, &mut trials, 1, NO); // -> 1, divisor 2, step 0.5
    assert!(!o.sequence.at_minimum_step_size);
    assert_eq!(trials[2].state, 1);
    assert_eq!(trials[2].turnpoint_counter, Some(0), "reversal above the floor");
    assert!(approx(trials[2].parameter_value, 4.5));

    let o = answer(&mut c, &mut trials, 2, YES); // -> 2, divisor 3, floored step
    assert!(o.sequence.at_minimum_step_size);
    assert!(!o.stopped);
    assert_eq!(trials[3].state, 2);
    assert_eq!(trials[3].turnpoint_counter, Some(1));
    assert!(approx(trials[3].parameter_value, 4.1));

    let o = answer(&mut c, &mut trials, 3, NO); // -> 1, second counted turnpoint
    assert!(o.stopped);
    assert_eq!(trials[4].state, -1);
    assert_eq!(trials[4].turnpoint_counter, Some(2));
    assert!(approx(trials[4].parameter_value, 4.5));
    assert!(c.state().terminated);
}

#[rstest]
fn out_of_table_state_is_reported_and_restarts_from_row_zero() {
    let mut c = controller(Procedure::Up1Down1, StoppingRule::Turnpoints);
    let mut trials = list(3, 5.0);
    trials[0].state = 7;

    let o = answer(&mut c, &mut trials, 0, YES);
    assert_eq!(o.status, AdvanceStatus::Advanced);
    assert_eq!(
        c.diagnostics(),
        &[StaircaseError::IllegalState {
            procedure: "up1_down1",
            state: 7,
        }]
    );
    // row 0, yes column
    assert_eq!(trials[1].state, 4);
    assert!(approx(trials[1].parameter_value, 4.0));

    // the sequence carries on normally from there
    answer(&mut c, &mut trials, 1, NO);
    assert_eq!(trials[2].state, 1);
    assert_eq!(c.diagnostics().len(), 1);
}
