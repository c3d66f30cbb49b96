use rstest::rstest;
use staircase_core::{
    NelderMead, Pava, Procedure, ResultMethod, SequenceController, StaircaseError, StoppingRule,
    TrialRecord,
};

const YES: i64 = 1;
const NO: i64 = 2;

fn controller(method: ResultMethod) -> SequenceController {
    SequenceController::builder(1)
        .with_result_method(method)
        .with_quantiles(vec![0.25, 0.5, 0.75])
        .build()
        .expect("build")
}

fn trial(state: i64, value: f64, response: i64) -> TrialRecord {
    TrialRecord::new(1, value, 1.0)
        .with_state(state)
        .with_response(response)
}

/// Trials whose turnpoints are preceded by 2.8, 2.6, 2.2, 2.4, 2.0 (oldest first).
fn reversal_history() -> Vec<TrialRecord> {
    vec![
        trial(0, 2.8, YES),
        trial(1, 0.0, YES),
        trial(4, 2.6, YES),
        trial(2, 0.0, YES),
        trial(4, 2.2, YES),
        trial(1, 0.0, YES),
        trial(4, 2.4, YES),
        trial(2, 0.0, YES),
        trial(4, 2.0, YES),
        trial(-1, 0.0, 0),
    ]
}

/// 20 presentations at each of 1..=5 with yes counts from a logistic
/// (pse 3, jnd 0.7), plus an unpresented final trial.
fn psychometric_history() -> Vec<TrialRecord> {
    let yes_counts = [1, 4, 10, 16, 19];
    let mut trials = Vec::new();
    for (k, yes) in yes_counts.iter().enumerate() {
        let x = (k + 1) as f64;
        for j in 0..20 {
            trials.push(trial(0, x, if j < *yes { YES } else { NO }));
        }
    }
    trials.push(trial(0, 3.0, YES));
    trials
}

#[rstest]
fn turnpoint_mean_drops_odd_sample() {
    let mut c = SequenceController::builder(1)
        .with_computing_points(6)
        .build()
        .expect("build");
    let mut trials = reversal_history();
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.n, 4);
    assert!((est.results[0] - 2.3).abs() < 1e-9, "{:?}", est.results);
    assert!(est.results[1] > 0.0);
    let last = trials.last().expect("trial");
    assert_eq!(last.results.as_deref(), Some(est.results.as_slice()));
    assert_eq!(last.turnpoint_counter, Some(4));
}

#[rstest]
fn turnpoint_mean_without_turnpoints_is_nan() {
    let mut c = controller(ResultMethod::TurnpointMean);
    let mut trials = vec![trial(0, 1.0, YES), trial(4, 2.0, YES)];
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.n, 0);
    assert!(est.results[0].is_nan());
    assert_eq!(est.results[1], 0.0);
}

#[rstest]
fn tail_mean_uses_last_presented_values() {
    let mut c = SequenceController::builder(1)
        .with_result_method(ResultMethod::TailMean)
        .with_computing_points(3)
        .build()
        .expect("build");
    let mut trials = vec![
        trial(0, 9.0, YES),
        trial(4, 3.0, YES),
        trial(4, 4.0, NO),
        trial(1, 5.0, YES),
        trial(-2, 100.0, 0),
    ];
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.n, 3);
    assert_eq!(est.results, vec![4.0, 1.0]);
}

#[rstest]
fn tail_mean_of_partial_run_ignores_unpresented_trials() {
    let mut c = SequenceController::builder(1)
        .with_procedure(Procedure::Up1Down1)
        .with_stopping_rule(StoppingRule::DontStop)
        .with_result_method(ResultMethod::TailMean)
        .with_computing_points(6)
        .build()
        .expect("build");
    let mut trials: Vec<TrialRecord> = (0..10).map(|_| TrialRecord::new(1, 5.0, 1.0)).collect();
    for i in 0..3 {
        trials[i].response = YES;
        c.advance(&mut trials, i).expect("advance");
    }
    // trial 3 is prepared at 2.0 but never shown; 4..10 still hold the start value
    assert_eq!(trials[3].parameter_value, 2.0);
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.n, 3);
    assert_eq!(est.results, vec![4.0, 1.0]);
}

#[rstest]
fn trials_after_termination_are_ignored() {
    let mut c = SequenceController::builder(1)
        .with_result_method(ResultMethod::TailMean)
        .with_computing_points(10)
        .build()
        .expect("build");
    let mut trials = vec![
        trial(0, 2.0, YES),
        trial(4, 4.0, YES),
        trial(-4, 3.0, 0),
        trial(0, 50.0, 0),
    ];
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.results[0], 3.0);
    // results still land in the last trial of the sequence
    assert_eq!(trials[3].results.as_deref(), Some(est.results.as_slice()));
}

#[rstest]
fn logistic_fit_recovers_generating_parameters() {
    let mut c = controller(ResultMethod::Logistic);
    let mut trials = psychometric_history();
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.n, 100);
    assert_eq!(est.results.len(), 4);
    let (mle_pse, mle_jnd, ls_pse, ls_jnd) =
        (est.results[0], est.results[1], est.results[2], est.results[3]);
    assert!((mle_pse - 3.0).abs() < 0.05, "mle pse {mle_pse}");
    assert!((ls_pse - 3.0).abs() < 0.05, "ls pse {ls_pse}");
    assert!((mle_jnd - 0.7).abs() < 0.15, "mle jnd {mle_jnd}");
    assert!((ls_jnd - 0.7).abs() < 0.15, "ls jnd {ls_jnd}");
    assert!(est.errors.is_empty());
}

#[rstest]
#[case(ResultMethod::Weibull)]
#[case(ResultMethod::Gumbel)]
fn asymmetric_shapes_land_near_the_midpoint(#[case] method: ResultMethod) {
    let mut c = controller(method);
    let mut trials = psychometric_history();
    let est = c.estimate(&mut trials).expect("estimate");
    for v in &est.results {
        assert!(v.is_finite(), "{method}: {:?}", est.results);
    }
    assert!((est.results[0] - 3.0).abs() < 0.5, "{method}: {:?}", est.results);
    assert!(est.results[1] > 0.0);
}

#[rstest]
fn fit_without_binary_responses_reports_and_yields_nan() {
    let mut c = controller(ResultMethod::Logistic);
    let mut trials = vec![trial(0, 1.0, 5), trial(4, 2.0, 5), trial(4, 3.0, 0)];
    let est = c.estimate(&mut trials).expect("estimate");
    assert!(est.results.iter().all(|v| v.is_nan()));
    assert!(matches!(est.errors.as_slice(), [StaircaseError::Solver(_)]));
    assert!(!c.diagnostics().is_empty());
}

#[rstest]
fn isotonic_inverts_each_quantile() {
    let mut c = controller(ResultMethod::IsotonicRegression);
    let mut trials = vec![
        trial(0, 1.0, NO),
        trial(4, 2.0, NO),
        trial(3, 3.0, YES),
        trial(1, 4.0, YES),
        trial(-2, 0.0, 0),
    ];
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(est.results, vec![2.25, 2.5, 2.75]);
    assert_eq!(est.goodness_of_fit, Some(0.0));
    assert_eq!(est.n, 4);
}

#[rstest]
fn isotonic_unreached_quantile_is_nan() {
    let mut c = controller(ResultMethod::IsotonicRegression);
    let mut trials = vec![trial(0, 1.0, NO), trial(4, 2.0, NO), trial(-4, 0.0, 0)];
    let est = c.estimate(&mut trials).expect("estimate");
    assert!(est.results.iter().all(|v| v.is_nan()));
}

#[rstest]
fn results_go_to_controller_slot_without_results_field() {
    let mut c = controller(ResultMethod::TurnpointMean);
    let mut trials: Vec<TrialRecord> = reversal_history()
        .into_iter()
        .map(TrialRecord::without_results)
        .collect();
    let est = c.estimate(&mut trials).expect("estimate");
    assert_eq!(c.results(), Some(est.results.as_slice()));
    assert!(c.diagnostics().iter().any(|e| matches!(
        e,
        StaircaseError::MissingField {
            field: "results",
            ..
        }
    )));
}

#[rstest]
fn estimate_with_custom_solvers() {
    let mut c = controller(ResultMethod::Logistic);
    let mut trials = psychometric_history();
    let coarse = NelderMead {
        max_iterations: 2000,
        tolerance: 1e-6,
    };
    let est = c
        .estimate_with(&mut trials, &coarse, &Pava)
        .expect("estimate");
    assert!((est.results[0] - 3.0).abs() < 0.05);
}

#[rstest]
fn estimate_of_absent_sequence_is_an_error() {
    let mut c = controller(ResultMethod::TurnpointMean);
    let mut trials = vec![TrialRecord::new(5, 1.0, 1.0)];
    let err = c.estimate(&mut trials).expect_err("no trials of sequence 1");
    assert!(matches!(
        err.downcast_ref::<StaircaseError>(),
        Some(StaircaseError::NoTrials(1))
    ));
}
