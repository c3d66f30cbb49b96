//! `From` implementations bridging `staircase_config` types to core types.

use std::collections::BTreeMap;

use crate::config::{FitCfg, RunCfg, SequenceCfg};
use crate::procedure::{ResponseCodes, Selector};
use crate::step::StepSize;
use crate::trial::TrialRecord;

// ── Selector ─────────────────────────────────────────────────────────────────

impl From<&staircase_config::CodeOrName> for Selector {
    fn from(c: &staircase_config::CodeOrName) -> Self {
        match c {
            staircase_config::CodeOrName::Code(v) => Self::Code(*v),
            staircase_config::CodeOrName::Name(n) => Self::Name(n.clone()),
        }
    }
}

// ── ResponseCodes ────────────────────────────────────────────────────────────

impl From<&staircase_config::Responses> for ResponseCodes {
    fn from(c: &staircase_config::Responses) -> Self {
        Self {
            yes: c.yes,
            no: c.no,
            stop: c.stop,
        }
    }
}

// ── StepSize ─────────────────────────────────────────────────────────────────

impl From<&staircase_config::StepCfg> for StepSize {
    fn from(c: &staircase_config::StepCfg) -> Self {
        Self {
            base: c.size,
            floor: c.min_size,
            increment: c.increment,
            decrement: c.decrement,
            upward_factor: c.upward_factor,
        }
    }
}

// ── FitCfg ───────────────────────────────────────────────────────────────────

impl From<&staircase_config::FitCfg> for FitCfg {
    fn from(c: &staircase_config::FitCfg) -> Self {
        Self {
            guess_rate: c.guess_rate,
            lapse_rate: c.lapse_rate,
            max_iterations: c.max_iterations,
            tolerance: c.tolerance,
        }
    }
}

// ── SequenceCfg ──────────────────────────────────────────────────────────────

impl From<&staircase_config::StaircaseCfg> for SequenceCfg {
    fn from(c: &staircase_config::StaircaseCfg) -> Self {
        Self {
            procedure: (&c.procedure).into(),
            stopping_rule: (&c.stopping_rule).into(),
            result_method: (&c.result_method).into(),
            parameter_name: c.parameter.clone(),
            start_value: c.start_value,
            start_divisor: c.start_divisor,
            range_limits: c.limits,
            quantiles: c.quantiles.clone(),
            turnpoint_limit: c.turnpoint_limit,
            computing_points: c.computing_points,
            remove_trailing_trials: c.remove_trailing_trials,
            protocol: c.protocol,
        }
    }
}

impl SequenceCfg {
    /// Apply a `[[sequence]]` override on top of these settings.
    #[must_use]
    pub fn merged(&self, o: &staircase_config::SequenceOverride) -> Self {
        let mut out = self.clone();
        if let Some(p) = &o.procedure {
            out.procedure = p.into();
        }
        if let Some(r) = &o.stopping_rule {
            out.stopping_rule = r.into();
        }
        if let Some(m) = &o.result_method {
            out.result_method = m.into();
        }
        if let Some(name) = &o.parameter {
            out.parameter_name.clone_from(name);
        }
        if let Some(v) = o.start_value {
            out.start_value = v;
        }
        if let Some(d) = o.start_divisor {
            out.start_divisor = d;
        }
        if let Some(n) = o.turnpoint_limit {
            out.turnpoint_limit = n;
        }
        if let Some(n) = o.computing_points {
            out.computing_points = n;
        }
        if let Some(q) = &o.quantiles {
            out.quantiles.clone_from(q);
        }
        if o.limits.is_some() {
            out.range_limits = o.limits;
        }
        out
    }
}

// ── RunCfg ───────────────────────────────────────────────────────────────────

impl From<&staircase_config::Config> for RunCfg {
    fn from(c: &staircase_config::Config) -> Self {
        let defaults = SequenceCfg::from(&c.staircase);
        let overrides: BTreeMap<i64, SequenceCfg> = c
            .sequences
            .iter()
            .map(|o| (o.id, defaults.merged(o)))
            .collect();
        Self {
            responses: (&c.responses).into(),
            step: (&c.step).into(),
            fit: (&c.fit).into(),
            defaults,
            overrides,
        }
    }
}

// ── Trial rows ───────────────────────────────────────────────────────────────

impl From<staircase_config::TrialRow> for TrialRecord {
    fn from(r: staircase_config::TrialRow) -> Self {
        Self {
            sequence_id: r.sequence_id,
            trial_counter: r.trial_counter,
            state: r.state,
            parameter_value: r.parameter_value,
            step_divisor: r.step_divisor,
            turnpoint_counter: r.turnpoint_counter,
            response: r.response,
            results: Some(Vec::new()),
        }
    }
}

impl From<&TrialRecord> for staircase_config::TrialRow {
    fn from(t: &TrialRecord) -> Self {
        Self {
            sequence_id: t.sequence_id,
            trial_counter: t.trial_counter,
            state: t.state,
            parameter_value: t.parameter_value,
            step_divisor: t.step_divisor,
            turnpoint_counter: t.turnpoint_counter,
            response: t.response,
        }
    }
}
