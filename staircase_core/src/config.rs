//! Runtime configuration types for the staircase engine.
//!
//! These are what controllers are built from. They are separate from the
//! TOML-deserialized config in `staircase_config`; see `conversions` for the
//! bridge.

use std::collections::BTreeMap;

use crate::procedure::{Procedure, ResponseCodes, ResultMethod, Selector, StoppingRule};
use crate::step::StepSize;

/// Psychometric fitting configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitCfg {
    /// Lower asymptote of the psychometric function.
    pub guess_rate: f64,
    /// Distance of the upper asymptote from 1.
    pub lapse_rate: f64,
    /// Iteration cap for the Nelder–Mead minimizer.
    pub max_iterations: u32,
    /// Bound on the standard deviation of objective values over the simplex.
    pub tolerance: f64,
}

impl Default for FitCfg {
    fn default() -> Self {
        Self {
            guess_rate: 0.0,
            lapse_rate: 0.0,
            max_iterations: 500,
            tolerance: 1e-8,
        }
    }
}

/// Settings of one sequence, with policies still in selector form.
///
/// Selectors are resolved when the controller is built so that an unknown
/// code falls back and is reported exactly once, at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceCfg {
    pub procedure: Selector,
    pub stopping_rule: Selector,
    pub result_method: Selector,
    /// Label of the adjusted trial field; informational.
    pub parameter_name: String,
    pub start_value: f64,
    pub start_divisor: f64,
    pub range_limits: Option<(f64, f64)>,
    /// Probabilities at which the isotonic fit is inverted.
    pub quantiles: Vec<f64>,
    pub turnpoint_limit: u32,
    pub computing_points: u32,
    pub remove_trailing_trials: bool,
    pub protocol: bool,
}

impl Default for SequenceCfg {
    fn default() -> Self {
        Self {
            procedure: Procedure::Up1Down1.into(),
            stopping_rule: StoppingRule::Turnpoints.into(),
            result_method: ResultMethod::TurnpointMean.into(),
            parameter_name: "intensity".into(),
            start_value: 1.0,
            start_divisor: 1.0,
            range_limits: None,
            quantiles: vec![0.5],
            turnpoint_limit: 8,
            computing_points: 6,
            remove_trailing_trials: true,
            protocol: false,
        }
    }
}

/// Everything a `SequenceRegistry` needs for a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCfg {
    pub responses: ResponseCodes,
    pub step: StepSize,
    pub fit: FitCfg,
    /// Settings for sequences without an override.
    pub defaults: SequenceCfg,
    /// Complete per-sequence settings, already merged over `defaults`.
    pub overrides: BTreeMap<i64, SequenceCfg>,
}

impl RunCfg {
    pub fn sequence(&self, id: i64) -> &SequenceCfg {
        self.overrides.get(&id).unwrap_or(&self.defaults)
    }
}
