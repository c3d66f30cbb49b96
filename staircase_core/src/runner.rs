//! Trial-execution loop driving a registry with an observer.

use std::sync::atomic::{AtomicBool, Ordering};

use staircase_traits::Observer;

use crate::error::Result;
use crate::registry::SequenceRegistry;
use crate::status::AdvanceStatus;
use crate::trial::TrialList;

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Trials presented to the observer.
    pub presented: usize,
    /// Trials skipped because their sequence had terminated.
    pub skipped: usize,
    /// Sequence ids that ran out of trials before a stopping rule fired.
    pub exhausted: Vec<i64>,
    /// Sequence ids stopped by their stopping rule.
    pub stopped: Vec<i64>,
    /// The shutdown flag ended the loop early.
    pub interrupted: bool,
}

/// Present every executable trial in list order and advance its sequence.
///
/// The list may shrink during the run (trailing trials of terminated
/// sequences are removed); only trials after the current index are touched,
/// so the loop index stays valid.
pub fn run_trials<L, O>(
    registry: &mut SequenceRegistry,
    trials: &mut L,
    observer: &mut O,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    L: TrialList + ?Sized,
    O: Observer + ?Sized,
{
    let mut summary = RunSummary::default();
    let mut i = 0;
    while i < trials.len() {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(index = i, "trial loop interrupted");
            summary.interrupted = true;
            break;
        }
        let Some(trial) = trials.trial(i) else {
            break;
        };
        if !registry.exec_trial(trial) {
            summary.skipped += 1;
            i += 1;
            continue;
        }
        let (id, value) = (trial.sequence_id, trial.parameter_value);
        let response = observer
            .respond(id, value)
            .map_err(|e| eyre::eyre!("observer failed on trial {i} of sequence {id}: {e}"))?;
        if let Some(t) = trials.trial_mut(i) {
            t.response = response;
        }
        summary.presented += 1;
        tracing::trace!(index = i, sequence_id = id, value, response, "trial presented");

        if let Some(outcome) = registry.advance(trials, i)? {
            if outcome.status == AdvanceStatus::Exhausted {
                summary.exhausted.push(id);
            }
            if outcome.stopped && !summary.stopped.contains(&id) {
                summary.stopped.push(id);
            }
        }
        i += 1;
    }
    tracing::info!(
        presented = summary.presented,
        skipped = summary.skipped,
        stopped = summary.stopped.len(),
        "trial loop finished"
    );
    Ok(summary)
}
