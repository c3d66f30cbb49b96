//! Builder for `SequenceController`.
//!
//! Only the sequence id is mandatory. Policy selectors are resolved in
//! `build()`: unknown codes fall back and are recorded as the controller's
//! first diagnostics. Numeric constants are validated and rejected.

use staircase_traits::ProtocolSink;

use crate::config::{FitCfg, SequenceCfg};
use crate::controller::{MissingReported, SequenceController};
use crate::error::{BuildError, Result};
use crate::procedure::{Procedure, ResponseCodes, ResultMethod, Selector, StoppingRule};
use crate::status::SequenceState;
use crate::step::StepSize;

pub struct SequenceBuilder {
    id: i64,
    settings: Option<SequenceCfg>,
    responses: Option<ResponseCodes>,
    step: Option<StepSize>,
    fit: Option<FitCfg>,
    protocol: Option<Box<dyn ProtocolSink>>,
}

fn validate(
    id: i64,
    settings: &SequenceCfg,
    responses: &ResponseCodes,
    step: &StepSize,
    fit: &FitCfg,
) -> Result<()> {
    if id < 1 {
        return Err(eyre::Report::new(BuildError::InvalidId(id)));
    }
    if !step.base.is_finite() || step.base == 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "step base must be finite and non-zero",
        )));
    }
    if !step.floor.is_finite() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "step floor must be finite",
        )));
    }
    if !(step.decrement.is_finite() && step.decrement > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "step decrement must be > 0",
        )));
    }
    if !(step.increment.is_finite() && step.increment >= 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "step increment must be >= 0",
        )));
    }
    if !(step.upward_factor.is_finite() && step.upward_factor > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "upward step factor must be > 0",
        )));
    }
    if !(settings.start_divisor.is_finite() && settings.start_divisor > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "start divisor must be > 0",
        )));
    }
    if let Some((lo, hi)) = settings.range_limits
        && !(lo.is_finite() && hi.is_finite() && lo <= hi)
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "range limits must be finite and ordered",
        )));
    }
    if settings.turnpoint_limit == 0 || settings.computing_points == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "turnpoint limit and computing points must be >= 1",
        )));
    }
    if settings.quantiles.iter().any(|q| !(*q > 0.0 && *q < 1.0)) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "quantiles must lie in (0, 1)",
        )));
    }
    if responses.yes == responses.no
        || responses.yes == responses.stop
        || responses.no == responses.stop
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "response codes must be distinct",
        )));
    }
    if !(0.0..1.0).contains(&fit.guess_rate)
        || !(0.0..1.0).contains(&fit.lapse_rate)
        || fit.guess_rate + fit.lapse_rate >= 1.0
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "guess and lapse rates must be >= 0 and sum below 1",
        )));
    }
    Ok(())
}

impl SequenceBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            settings: None,
            responses: None,
            step: None,
            fit: None,
            protocol: None,
        }
    }

    fn settings_mut(&mut self) -> &mut SequenceCfg {
        self.settings.get_or_insert_with(SequenceCfg::default)
    }

    pub fn with_settings(mut self, settings: SequenceCfg) -> Self {
        self.settings = Some(settings);
        self
    }
    pub fn with_responses(mut self, responses: ResponseCodes) -> Self {
        self.responses = Some(responses);
        self
    }
    pub fn with_step(mut self, step: StepSize) -> Self {
        self.step = Some(step);
        self
    }
    pub fn with_fit(mut self, fit: FitCfg) -> Self {
        self.fit = Some(fit);
        self
    }
    pub fn with_protocol_sink(mut self, sink: Box<dyn ProtocolSink>) -> Self {
        self.protocol = Some(sink);
        self.settings_mut().protocol = true;
        self
    }
    pub fn with_procedure(mut self, procedure: impl Into<Selector>) -> Self {
        self.settings_mut().procedure = procedure.into();
        self
    }
    pub fn with_stopping_rule(mut self, rule: impl Into<Selector>) -> Self {
        self.settings_mut().stopping_rule = rule.into();
        self
    }
    pub fn with_result_method(mut self, method: impl Into<Selector>) -> Self {
        self.settings_mut().result_method = method.into();
        self
    }
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.settings_mut().range_limits = Some((lower, upper));
        self
    }
    pub fn with_quantiles(mut self, quantiles: Vec<f64>) -> Self {
        self.settings_mut().quantiles = quantiles;
        self
    }
    pub fn with_turnpoint_limit(mut self, n: u32) -> Self {
        self.settings_mut().turnpoint_limit = n;
        self
    }
    pub fn with_computing_points(mut self, n: u32) -> Self {
        self.settings_mut().computing_points = n;
        self
    }
    pub fn with_remove_trailing_trials(mut self, remove: bool) -> Self {
        self.settings_mut().remove_trailing_trials = remove;
        self
    }

    pub fn build(self) -> Result<SequenceController> {
        let settings = self.settings.unwrap_or_default();
        let responses = self.responses.unwrap_or_default();
        let step = self.step.unwrap_or_default();
        let fit = self.fit.unwrap_or_default();
        validate(self.id, &settings, &responses, &step, &fit)?;

        let (procedure, e1) = Procedure::resolve(&settings.procedure);
        let (stopping_rule, e2) = StoppingRule::resolve(&settings.stopping_rule);
        let (result_method, e3) = ResultMethod::resolve(&settings.result_method);

        let protocol = match self.protocol {
            Some(sink) => Some(sink),
            None if settings.protocol => {
                Some(Box::new(crate::protocol::TracingSink) as Box<dyn ProtocolSink>)
            }
            None => None,
        };

        let mut controller = SequenceController {
            id: self.id,
            procedure,
            stopping_rule,
            result_method,
            settings,
            responses,
            step,
            fit,
            state: SequenceState::default(),
            diagnostics: Vec::new(),
            results: None,
            protocol,
            missing: MissingReported::default(),
        };
        for err in [e1, e2, e3].into_iter().flatten() {
            tracing::error!(sequence_id = controller.id, error = %err, "invalid sequence configuration");
            controller.diagnostics.push(err);
        }
        tracing::info!(
            sequence_id = controller.id,
            procedure = procedure.name(),
            stopping_rule = stopping_rule.name(),
            result_method = result_method.name(),
            "sequence created"
        );
        Ok(controller)
    }
}
