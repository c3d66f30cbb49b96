#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and trial-list parsing for the staircase engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Procedure, stopping-rule and result-method selectors are kept as raw
//!   codes or names here; resolving them (and falling back on unknown values)
//!   is the engine's job, so an unknown code is never a validation error.
//! - The trial-list CSV loader enforces exact headers.
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// A selector given either as an integer code or as a name.
///
/// Accepts `procedure = 2` as well as `procedure = "up1_down1"`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CodeOrName {
    Code(i64),
    Name(String),
}

impl std::fmt::Display for CodeOrName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(c) => write!(f, "{c}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// Response key codes for the whole run.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Responses {
    pub yes: i64,
    pub no: i64,
    pub stop: i64,
}

impl Default for Responses {
    fn default() -> Self {
        Self {
            yes: 1,
            no: 2,
            stop: 27,
        }
    }
}

/// Defaults applied to every adaptive sequence.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StaircaseCfg {
    pub procedure: CodeOrName,
    pub stopping_rule: CodeOrName,
    pub result_method: CodeOrName,
    /// Name of the trial field the sequence adjusts (informational label).
    pub parameter: String,
    /// Initial parameter value written into the first trial of a sequence.
    pub start_value: f64,
    /// Initial step divisor.
    pub start_divisor: f64,
    pub turnpoint_limit: u32,
    /// Number of samples used by the mean-based estimators.
    pub computing_points: u32,
    /// Drop the remaining trials of a sequence once it terminates.
    pub remove_trailing_trials: bool,
    /// Emit a protocol line per advanced trial.
    pub protocol: bool,
    /// Probabilities at which isotonic regression is inverted.
    pub quantiles: Vec<f64>,
    /// Optional parameter range. Accepts either:
    /// - a tuple: [0.0, 10.0]
    /// - a table: { lower = 0.0, upper = 10.0 }
    #[serde(deserialize_with = "de_limits")]
    pub limits: Option<(f64, f64)>,
}

impl Default for StaircaseCfg {
    fn default() -> Self {
        Self {
            procedure: CodeOrName::Name("up1_down1".into()),
            stopping_rule: CodeOrName::Name("turnpoints".into()),
            result_method: CodeOrName::Name("turnpoint_mean".into()),
            parameter: "intensity".into(),
            start_value: 1.0,
            start_divisor: 1.0,
            turnpoint_limit: 8,
            computing_points: 6,
            remove_trailing_trials: true,
            protocol: false,
            quantiles: vec![0.5],
            limits: None,
        }
    }
}

/// Step-size constants.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StepCfg {
    /// Base step, divided by the running step divisor.
    pub size: f64,
    /// Floor for the step magnitude.
    pub min_size: f64,
    /// Added to the divisor after a reversal.
    pub increment: f64,
    /// Subtracted from the divisor on a run; also the divisor's floor.
    pub decrement: f64,
    /// Scale applied to upward steps.
    pub upward_factor: f64,
}

impl Default for StepCfg {
    fn default() -> Self {
        Self {
            size: 1.0,
            min_size: 0.125,
            increment: 1.0,
            decrement: 1.0,
            upward_factor: 1.0,
        }
    }
}

/// Psychometric-function fitting parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FitCfg {
    pub guess_rate: f64,
    pub lapse_rate: f64,
    /// Iteration cap for the simplex minimizer.
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

/// Per-sequence overrides of `[staircase]`; every key except `id` is optional.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SequenceOverride {
    pub id: i64,
    pub procedure: Option<CodeOrName>,
    pub stopping_rule: Option<CodeOrName>,
    pub result_method: Option<CodeOrName>,
    pub parameter: Option<String>,
    pub start_value: Option<f64>,
    pub start_divisor: Option<f64>,
    pub turnpoint_limit: Option<u32>,
    pub computing_points: Option<u32>,
    pub quantiles: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "de_limits")]
    pub limits: Option<(f64, f64)>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Settings for the simulated run driven by the CLI.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationCfg {
    /// Sequence ids to interleave; each gets `trials_per_sequence` trials.
    pub sequences: Vec<i64>,
    pub trials_per_sequence: u32,
    /// Simulated observer threshold (50% point of the logistic).
    pub threshold: f64,
    /// Simulated observer spread; 0 gives a deterministic observer.
    pub spread: f64,
    pub seed: u64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            sequences: vec![1],
            trials_per_sequence: 40,
            threshold: 0.5,
            spread: 0.1,
            seed: 7,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub responses: Responses,
    #[serde(default)]
    pub staircase: StaircaseCfg,
    #[serde(default)]
    pub step: StepCfg,
    #[serde(default)]
    pub fit: FitCfg,
    /// Per-sequence overrides, written as `[[sequence]]` tables.
    #[serde(default, rename = "sequence")]
    pub sequences: Vec<SequenceOverride>,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LimitsToml {
    Tuple((f64, f64)),
    Table { lower: f64, upper: f64 },
}

fn de_limits<'de, D>(deserializer: D) -> Result<Option<(f64, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<LimitsToml> = Option::deserialize(deserializer)?;
    Ok(opt.map(|l| match l {
        LimitsToml::Tuple(t) => t,
        LimitsToml::Table { lower, upper } => (lower, upper),
    }))
}

/// Trial-list CSV schema.
///
/// Expected headers:
/// sequence_id,trial_counter,state,parameter_value,step_divisor,turnpoint_counter,response
///
/// `turnpoint_counter` may be left empty for lists that do not carry the field.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct TrialRow {
    pub sequence_id: i64,
    pub trial_counter: i64,
    pub state: i64,
    pub parameter_value: f64,
    pub step_divisor: f64,
    pub turnpoint_counter: Option<i64>,
    pub response: i64,
}

pub const TRIAL_HEADERS: [&str; 7] = [
    "sequence_id",
    "trial_counter",
    "state",
    "parameter_value",
    "step_divisor",
    "turnpoint_counter",
    "response",
];

pub fn load_trials_csv(path: &std::path::Path) -> eyre::Result<Vec<TrialRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trial CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != TRIAL_HEADERS {
        eyre::bail!(
            "trial CSV must have headers '{}', got: {}",
            TRIAL_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TrialRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("trial CSV {:?} contains no trials", path);
    }
    Ok(rows)
}

pub fn write_trials_csv(path: &std::path::Path, rows: &[TrialRow]) -> eyre::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| eyre::eyre!("create trial CSV {:?}: {}", path, e))?;
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| eyre::eyre!("write trial CSV {:?}: {}", path, e))?;
    }
    wtr.flush()
        .map_err(|e| eyre::eyre!("flush trial CSV {:?}: {}", path, e))?;
    Ok(())
}

fn check_limits(limits: Option<(f64, f64)>, what: &str) -> eyre::Result<()> {
    if let Some((lo, hi)) = limits {
        if !(lo.is_finite() && hi.is_finite()) {
            eyre::bail!("{what}.limits must be finite");
        }
        if lo > hi {
            eyre::bail!("{what}.limits lower bound must be <= upper bound");
        }
    }
    Ok(())
}

fn check_quantiles(quantiles: &[f64], what: &str) -> eyre::Result<()> {
    for q in quantiles {
        if !(*q > 0.0 && *q < 1.0) {
            eyre::bail!("{what}.quantiles must lie in (0.0, 1.0), got {q}");
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Responses
        let r = &self.responses;
        if r.yes == r.no || r.yes == r.stop || r.no == r.stop {
            eyre::bail!("responses.yes, responses.no and responses.stop must be distinct");
        }

        // Step
        if !self.step.size.is_finite() || self.step.size == 0.0 {
            eyre::bail!("step.size must be finite and non-zero");
        }
        if !self.step.min_size.is_finite() {
            eyre::bail!("step.min_size must be finite");
        }
        if !(self.step.decrement.is_finite() && self.step.decrement > 0.0) {
            eyre::bail!("step.decrement must be > 0");
        }
        if !(self.step.increment.is_finite() && self.step.increment >= 0.0) {
            eyre::bail!("step.increment must be >= 0");
        }
        if !(self.step.upward_factor.is_finite() && self.step.upward_factor > 0.0) {
            eyre::bail!("step.upward_factor must be > 0");
        }

        // Staircase defaults
        let s = &self.staircase;
        if !(s.start_divisor.is_finite() && s.start_divisor > 0.0) {
            eyre::bail!("staircase.start_divisor must be > 0");
        }
        if !s.start_value.is_finite() {
            eyre::bail!("staircase.start_value must be finite");
        }
        if s.turnpoint_limit == 0 {
            eyre::bail!("staircase.turnpoint_limit must be >= 1");
        }
        if s.computing_points == 0 {
            eyre::bail!("staircase.computing_points must be >= 1");
        }
        check_quantiles(&s.quantiles, "staircase")?;
        check_limits(s.limits, "staircase")?;
        if let Some((lo, hi)) = s.limits
            && !(lo..=hi).contains(&s.start_value)
        {
            eyre::bail!("staircase.start_value must lie within staircase.limits");
        }

        // Overrides
        let mut seen = std::collections::BTreeSet::new();
        for o in &self.sequences {
            if o.id < 1 {
                eyre::bail!("sequence.id must be >= 1, got {}", o.id);
            }
            if !seen.insert(o.id) {
                eyre::bail!("sequence.id {} is configured twice", o.id);
            }
            if let Some(d) = o.start_divisor
                && !(d.is_finite() && d > 0.0)
            {
                eyre::bail!("sequence {}: start_divisor must be > 0", o.id);
            }
            if o.turnpoint_limit == Some(0) {
                eyre::bail!("sequence {}: turnpoint_limit must be >= 1", o.id);
            }
            if o.computing_points == Some(0) {
                eyre::bail!("sequence {}: computing_points must be >= 1", o.id);
            }
            if let Some(q) = &o.quantiles {
                check_quantiles(q, "sequence")?;
            }
            check_limits(o.limits, "sequence")?;
        }

        // Fit
        let f = &self.fit;
        if !(0.0..1.0).contains(&f.guess_rate) || !(0.0..1.0).contains(&f.lapse_rate) {
            eyre::bail!("fit.guess_rate and fit.lapse_rate must lie in [0.0, 1.0)");
        }
        if f.guess_rate + f.lapse_rate >= 1.0 {
            eyre::bail!("fit.guess_rate + fit.lapse_rate must be < 1.0");
        }
        if f.max_iterations == 0 {
            eyre::bail!("fit.max_iterations must be >= 1");
        }
        if !(f.tolerance.is_finite() && f.tolerance > 0.0) {
            eyre::bail!("fit.tolerance must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        // Simulation
        let sim = &self.simulation;
        if sim.sequences.is_empty() {
            eyre::bail!("simulation.sequences must name at least one sequence");
        }
        if sim.sequences.iter().any(|id| *id < 1) {
            eyre::bail!("simulation.sequences ids must be >= 1");
        }
        if sim.trials_per_sequence == 0 {
            eyre::bail!("simulation.trials_per_sequence must be >= 1");
        }
        if !(sim.spread.is_finite() && sim.spread >= 0.0) {
            eyre::bail!("simulation.spread must be >= 0");
        }
        if !sim.threshold.is_finite() {
            eyre::bail!("simulation.threshold must be finite");
        }

        Ok(())
    }
}
