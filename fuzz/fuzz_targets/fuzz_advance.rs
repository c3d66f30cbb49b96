#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use staircase_core::trial::interleaved;
use staircase_core::{SequenceController, TrialList};

#[derive(Debug, Arbitrary)]
struct Input {
    procedure: i64,
    stopping_rule: i64,
    result_method: i64,
    start: i8,
    limits: Option<(i8, i8)>,
    responses: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let mut builder = SequenceController::builder(1)
        .with_procedure(input.procedure)
        .with_stopping_rule(input.stopping_rule)
        .with_result_method(input.result_method);
    if let Some((a, b)) = input.limits {
        let (lo, hi) = (f64::from(a.min(b)), f64::from(a.max(b)));
        builder = builder.with_limits(lo, hi);
    }
    let Ok(mut controller) = builder.build() else {
        return;
    };

    let n = u32::try_from(input.responses.len().min(64)).unwrap_or(0);
    let mut trials = interleaved(&[(1, f64::from(input.start), 1.0)], n);
    let mut i = 0;
    while i < trials.len() {
        if !controller.exec_trial(&trials[i]) {
            break;
        }
        // 0..=3 maps to yes, no, stop and an unknown key
        let code = match input.responses[i % input.responses.len()] % 4 {
            0 => 1,
            1 => 2,
            2 => 27,
            _ => 99,
        };
        trials[i].response = code;
        if controller.advance(&mut trials, i).is_err() {
            break;
        }
        i += 1;
    }
    let _ = controller.estimate(&mut trials);
});
