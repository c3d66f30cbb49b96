//! Per-sequence adaptive controller.

use staircase_traits::{Minimizer, MonotoneRegression, ProtocolSink};

use crate::builder::SequenceBuilder;
use crate::config::{FitCfg, SequenceCfg};
use crate::error::{Result, StaircaseError};
use crate::estimate::{Estimate, EstimateParams, Observation, estimate_observations};
use crate::fixup::{FixInput, FixOutcome, fix_parameter};
use crate::isotonic::Pava;
use crate::procedure::{Procedure, ResponseCodes, ResultMethod, StoppingRule};
use crate::simplex::NelderMead;
use crate::status::{AdvanceOutcome, AdvanceStatus, SequenceState};
use crate::step::StepSize;
use crate::stopping::should_stop;
use crate::transition::next_state;
use crate::trial::TrialList;

/// Fields already reported as missing, so each is reported once.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MissingReported {
    turnpoint_counter: bool,
    results: bool,
}

/// One adaptive sequence: its policies, constants and running flags.
pub struct SequenceController {
    pub(crate) id: i64,
    pub(crate) procedure: Procedure,
    pub(crate) stopping_rule: StoppingRule,
    pub(crate) result_method: ResultMethod,
    pub(crate) settings: SequenceCfg,
    pub(crate) responses: ResponseCodes,
    pub(crate) step: StepSize,
    pub(crate) fit: FitCfg,
    pub(crate) state: SequenceState,
    pub(crate) diagnostics: Vec<StaircaseError>,
    pub(crate) results: Option<Vec<f64>>,
    pub(crate) protocol: Option<Box<dyn ProtocolSink>>,
    pub(crate) missing: MissingReported,
}

impl core::fmt::Debug for SequenceController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SequenceController")
            .field("id", &self.id)
            .field("procedure", &self.procedure)
            .field("stopping_rule", &self.stopping_rule)
            .field("result_method", &self.result_method)
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics.len())
            .field("protocol", &self.protocol.is_some())
            .finish()
    }
}

impl SequenceController {
    /// Start building a controller for sequence `id`.
    pub fn builder(id: i64) -> SequenceBuilder {
        SequenceBuilder::new(id)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn procedure(&self) -> Procedure {
        self.procedure
    }

    pub fn stopping_rule(&self) -> StoppingRule {
        self.stopping_rule
    }

    pub fn result_method(&self) -> ResultMethod {
        self.result_method
    }

    pub fn settings(&self) -> &SequenceCfg {
        &self.settings
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Non-fatal problems reported so far, oldest first.
    pub fn diagnostics(&self) -> &[StaircaseError] {
        &self.diagnostics
    }

    /// Results kept here when the trial list has no results column.
    pub fn results(&self) -> Option<&[f64]> {
        self.results.as_deref()
    }

    pub(crate) fn report(&mut self, err: StaircaseError) {
        tracing::warn!(sequence_id = self.id, error = %err, "staircase report");
        self.diagnostics.push(err);
    }

    /// Whether the runner should present `trial`.
    pub fn exec_trial(&self, trial: &crate::trial::TrialRecord) -> bool {
        self.procedure == Procedure::NonAdaptive || (trial.state >= 0 && !self.state.terminated)
    }

    /// Prepare the next trial of this sequence from the completed trial at
    /// `current`.
    ///
    /// Returns an error only when `current` is not a trial of this sequence;
    /// every other problem is reported and absorbed.
    pub fn advance<L: TrialList + ?Sized>(
        &mut self,
        trials: &mut L,
        current: usize,
    ) -> Result<AdvanceOutcome> {
        let len = trials.len();
        let cur = trials
            .trial(current)
            .cloned()
            .ok_or_else(|| eyre::Report::new(StaircaseError::TrialIndex { index: current, len }))?;
        if cur.sequence_id != self.id {
            return Err(eyre::Report::new(StaircaseError::ForeignTrial {
                index: current,
                expected: self.id,
                found: cur.sequence_id,
            }));
        }

        let Some(next_index) = trials.next_of_sequence(current, self.id) else {
            self.report(StaircaseError::SequenceExhausted(self.id));
            return Ok(AdvanceOutcome::exhausted(self.state));
        };

        let mut st = self.state;
        let trial_counter = cur.trial_counter + 1;

        let t = next_state(
            self.procedure,
            self.stopping_rule,
            &self.responses,
            cur.state,
            cur.response,
        );
        st.response_error = t.response_error;
        if t.illegal_state {
            self.report(StaircaseError::IllegalState {
                procedure: self.procedure.name(),
                state: cur.state,
            });
        }
        if t.response_error {
            self.report(StaircaseError::MalformedResponse {
                sequence_id: self.id,
                response: cur.response,
            });
        }

        let mut written_state = t.state;
        let mut fix = None;
        let mut repeat = None;
        if t.response_error && self.procedure != Procedure::NonAdaptive {
            // Invalid response: value and divisor stay unchanged, the same stimulus is shown again.
            repeat = Some((cur.parameter_value, cur.step_divisor));
        } else if t.state >= 0 {
            let f = fix_parameter(
                self.procedure,
                &self.step,
                &FixInput {
                    current_state: cur.state,
                    next_state: t.state,
                    value: cur.parameter_value,
                    divisor: cur.step_divisor,
                    trial_counter,
                    limits: self.settings.range_limits,
                },
            );
            if let Some(at_floor) = f.at_floor {
                st.at_minimum_step_size = at_floor;
            }
            if let FixOutcome::Rejected { .. } = f.outcome {
                tracing::debug!(
                    sequence_id = self.id,
                    value = cur.parameter_value,
                    step = f.signed_step,
                    "parameter out of range; state reverted"
                );
                written_state = cur.state;
            }
            fix = Some(f.outcome);
        }

        let prior = cur.turnpoint_counter.unwrap_or(st.turnpoints);
        let decision = should_stop(
            self.stopping_rule,
            self.procedure,
            t.state,
            st.at_minimum_step_size,
            prior,
            self.settings.turnpoint_limit,
        );
        if let Some(n) = decision.turnpoints {
            st.turnpoints = n;
        }
        if decision.negate {
            written_state = -written_state.abs();
        }

        let mut missing_counter = false;
        if let Some(next) = trials.trial_mut(next_index) {
            next.trial_counter = trial_counter;
            next.state = written_state;
            match fix {
                Some(FixOutcome::Applied { value, divisor } | FixOutcome::Rejected { value, divisor }) => {
                    next.parameter_value = value;
                    next.step_divisor = divisor;
                }
                Some(FixOutcome::Untouched) | None => {
                    if let Some((value, divisor)) = repeat {
                        next.parameter_value = value;
                        next.step_divisor = divisor;
                    }
                }
            }
            if let Some(n) = decision.turnpoints {
                match next.turnpoint_counter.as_mut() {
                    Some(c) => *c = n,
                    None => missing_counter = true,
                }
            }
        }
        if missing_counter && !self.missing.turnpoint_counter {
            self.missing.turnpoint_counter = true;
            self.report(StaircaseError::MissingField {
                sequence_id: self.id,
                field: "turnpoint_counter",
            });
        }

        let mut removed = 0;
        if decision.stop {
            st.terminated = true;
            if self.settings.remove_trailing_trials {
                removed = trials.remove_after(next_index, self.id);
            }
            tracing::info!(
                sequence_id = self.id,
                turnpoints = st.turnpoints,
                removed,
                "sequence terminated"
            );
        }

        if self.settings.protocol
            && let Some(sink) = self.protocol.as_mut()
            && let Some(next) = trials.trial(next_index)
        {
            sink.line(&format!(
                "seq={} proc={} rule={} trial={} state={} turnpoints={} {}={} divisor={}",
                self.id,
                self.procedure,
                self.stopping_rule,
                next.trial_counter,
                next.state,
                st.turnpoints,
                self.settings.parameter_name,
                next.parameter_value,
                next.step_divisor,
            ));
        }

        self.state = st;
        Ok(AdvanceOutcome {
            status: AdvanceStatus::Advanced,
            next_index: Some(next_index),
            next_state: written_state,
            fix,
            stopped: decision.stop,
            removed,
            sequence: st,
        })
    }

    /// Estimate with the argmin-backed Nelder–Mead and the PAVA solver.
    pub fn estimate<L: TrialList + ?Sized>(&mut self, trials: &mut L) -> Result<Estimate> {
        let minimizer = NelderMead::from(&self.fit);
        self.estimate_with(trials, &minimizer, &Pava)
    }

    /// Estimate the threshold from this sequence's trials and write the
    /// results back into its last trial.
    ///
    /// Trials after the first terminated one are ignored.
    pub fn estimate_with<L, M, R>(
        &mut self,
        trials: &mut L,
        minimizer: &M,
        regression: &R,
    ) -> Result<Estimate>
    where
        L: TrialList + ?Sized,
        M: Minimizer + ?Sized,
        R: MonotoneRegression + ?Sized,
    {
        let indices = trials.indices_of_sequence(self.id);
        let Some(&last) = indices.last() else {
            return Err(eyre::Report::new(StaircaseError::NoTrials(self.id)));
        };

        let mut obs = Vec::with_capacity(indices.len());
        for &i in &indices {
            if let Some(t) = trials.trial(i) {
                obs.push(Observation {
                    state: t.state,
                    value: t.parameter_value,
                    response: t.response,
                });
                if t.state < 0 {
                    break;
                }
            }
        }

        let fallback_jnd = if self.step.base.is_finite() && self.step.base != 0.0 {
            self.step.base.abs()
        } else {
            1.0
        };
        let params = EstimateParams {
            method: self.result_method,
            codes: &self.responses,
            computing_points: self.settings.computing_points,
            turnpoint_limit: self.settings.turnpoint_limit,
            guess_rate: self.fit.guess_rate,
            lapse_rate: self.fit.lapse_rate,
            quantiles: &self.settings.quantiles,
            fallback_jnd,
        };
        let est = estimate_observations(self.id, &obs, &params, minimizer, regression);
        for e in &est.errors {
            self.report(e.clone());
        }

        let mut missing_results = false;
        if let Some(t) = trials.trial_mut(last) {
            match t.results.as_mut() {
                Some(slot) => slot.clone_from(&est.results),
                None => missing_results = true,
            }
            if let Some(c) = t.turnpoint_counter.as_mut() {
                *c = i64::try_from(est.n).unwrap_or(i64::MAX);
            }
        }
        if missing_results {
            self.results = Some(est.results.clone());
            if !self.missing.results {
                self.missing.results = true;
                self.report(StaircaseError::MissingField {
                    sequence_id: self.id,
                    field: "results",
                });
            }
        }

        tracing::debug!(
            sequence_id = self.id,
            method = self.result_method.name(),
            n = est.n,
            results = ?est.results,
            "sequence estimated"
        );
        Ok(est)
    }
}
