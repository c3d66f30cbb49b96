//! Threshold estimation statistics.
//!
//! The functions here work on plain observation slices; the controller
//! decides which trials are considered and where results are written.

use staircase_traits::{Minimizer, MonotoneCurve, MonotoneRegression};

use crate::error::StaircaseError;
use crate::procedure::{Response, ResponseCodes, ResultMethod};
use crate::psychometric::{Psychometric, PsychometricShape};
use crate::solver_error::map_solver_error;
use crate::table::is_turnpoint;

/// The trial fields the estimators look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub state: i64,
    pub value: f64,
    pub response: i64,
}

/// Mean, sample standard deviation and sample count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub sd: f64,
    pub n: usize,
}

/// The estimate of one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub sequence_id: i64,
    pub method: ResultMethod,
    /// Method-dependent: `[mean, sd]`, `[mle_pse, mle_jnd, ls_pse, ls_jnd]`,
    /// or one stimulus value per quantile.
    pub results: Vec<f64>,
    /// Number of samples or observations behind `results`.
    pub n: usize,
    /// Residual sum of squares of the isotonic fit.
    pub goodness_of_fit: Option<f64>,
    /// Non-fatal problems met while estimating.
    pub errors: Vec<StaircaseError>,
}

pub fn summarize(samples: &[f64]) -> Summary {
    let n = samples.len();
    if n == 0 {
        return Summary {
            mean: f64::NAN,
            sd: 0.0,
            n,
        };
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let sd = if n > 1 {
        let ss: f64 = samples.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    Summary { mean, sd, n }
}

/// Stimulus values that led into turnpoints, newest first.
///
/// At most `max_samples` are taken; an odd count drops the newest-collected
/// (that is, the earliest in the list) so up and down reversals pair up.
pub fn turnpoint_samples(obs: &[Observation], max_samples: usize) -> Vec<f64> {
    let mut samples = Vec::new();
    if max_samples == 0 {
        return samples;
    }
    for i in (1..obs.len()).rev() {
        if is_turnpoint(obs[i].state) {
            samples.push(obs[i - 1].value);
            if samples.len() >= max_samples {
                break;
            }
        }
    }
    if samples.len() % 2 == 1 {
        samples.pop();
    }
    samples
}

pub fn turnpoint_mean(obs: &[Observation], computing_points: u32, turnpoint_limit: u32) -> Summary {
    let max = computing_points.min(turnpoint_limit) as usize;
    summarize(&turnpoint_samples(obs, max))
}

/// Statistics over the last `computing_points` presented stimulus values.
///
/// A trial counts as presented when it is not terminal and its response is a
/// yes, no or stop key; prepared trials that were never run carry no such key.
pub fn tail_mean(obs: &[Observation], codes: &ResponseCodes, computing_points: u32) -> Summary {
    let presented: Vec<f64> = obs
        .iter()
        .filter(|o| o.state >= 0 && !matches!(codes.classify(o.response), Response::Invalid(_)))
        .map(|o| o.value)
        .collect();
    let take = (computing_points as usize).min(presented.len());
    summarize(&presented[presented.len() - take..])
}

/// Stimulus and 0/1 vectors of every trial except the final one, skipping
/// responses that are neither yes nor no.
pub fn binary_vectors(obs: &[Observation], codes: &ResponseCodes) -> (Vec<f64>, Vec<f64>) {
    let shown = &obs[..obs.len().saturating_sub(1)];
    shown
        .iter()
        .filter_map(|o| codes.as_binary(o.response).map(|r| (o.value, r)))
        .unzip()
}

/// Fitted psychometric parameters: `[mle_pse, mle_jnd, ls_pse, ls_jnd]`.
pub fn fit_psychometric<M: Minimizer + ?Sized>(
    model: &Psychometric,
    x: &[f64],
    r: &[f64],
    seed: [f64; 2],
    minimizer: &M,
) -> Result<Vec<f64>, StaircaseError> {
    let ls = minimizer
        .minimize(&|p: &[f64]| model.least_squares(p, x, r), &seed)
        .map_err(|e| map_solver_error(&*e))?;
    let ml = minimizer
        .minimize(&|p: &[f64]| model.neg_log_likelihood(p, x, r), &seed)
        .map_err(|e| map_solver_error(&*e))?;
    let coord = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(f64::NAN);
    Ok(vec![coord(&ml, 0), coord(&ml, 1), coord(&ls, 0), coord(&ls, 1)])
}

/// Inputs the dispatcher needs besides the observations.
#[derive(Debug, Clone, Copy)]
pub struct EstimateParams<'a> {
    pub method: ResultMethod,
    pub codes: &'a ResponseCodes,
    pub computing_points: u32,
    pub turnpoint_limit: u32,
    pub guess_rate: f64,
    pub lapse_rate: f64,
    pub quantiles: &'a [f64],
    /// Spread seed used when the turnpoints give no spread.
    pub fallback_jnd: f64,
}

/// Dispatch to the configured method.
///
/// Never fails: solver problems are collected in `Estimate::errors` and the
/// affected results are NaN.
pub fn estimate_observations<M, R>(
    sequence_id: i64,
    obs: &[Observation],
    p: &EstimateParams<'_>,
    minimizer: &M,
    regression: &R,
) -> Estimate
where
    M: Minimizer + ?Sized,
    R: MonotoneRegression + ?Sized,
{
    let mut errors = Vec::new();
    let mut goodness_of_fit = None;
    let (results, n) = match p.method {
        ResultMethod::TurnpointMean => {
            let s = turnpoint_mean(obs, p.computing_points, p.turnpoint_limit);
            (vec![s.mean, s.sd], s.n)
        }
        ResultMethod::TailMean => {
            let s = tail_mean(obs, p.codes, p.computing_points);
            (vec![s.mean, s.sd], s.n)
        }
        ResultMethod::Logistic | ResultMethod::Weibull | ResultMethod::Gumbel => {
            let (x, r) = binary_vectors(obs, p.codes);
            let seed_stats = turnpoint_mean(obs, p.computing_points, p.turnpoint_limit);
            let pse0 = if seed_stats.mean.is_finite() {
                seed_stats.mean
            } else {
                summarize(&x).mean
            };
            let jnd0 = if seed_stats.sd > 0.0 {
                seed_stats.sd
            } else {
                p.fallback_jnd
            };
            let shape = PsychometricShape::for_method(p.method).unwrap_or(PsychometricShape::Logistic);
            let model = Psychometric {
                shape,
                guess_rate: p.guess_rate,
                lapse_rate: p.lapse_rate,
            };
            let results = if x.is_empty() || !pse0.is_finite() {
                errors.push(StaircaseError::Solver(format!(
                    "sequence {sequence_id}: no yes/no responses to fit"
                )));
                vec![f64::NAN; 4]
            } else {
                match fit_psychometric(&model, &x, &r, [pse0, jnd0], minimizer) {
                    Ok(v) => v,
                    Err(e) => {
                        errors.push(e);
                        vec![f64::NAN; 4]
                    }
                }
            };
            tracing::debug!(sequence_id, ?shape, pse0, jnd0, n = x.len(), "psychometric fit");
            (results, x.len())
        }
        ResultMethod::IsotonicRegression => {
            let (x, r) = binary_vectors(obs, p.codes);
            let results = match regression.fit(&x, &r) {
                Ok(curve) => {
                    goodness_of_fit = Some(curve.goodness_of_fit());
                    p.quantiles
                        .iter()
                        .map(|q| curve.inverse(*q).unwrap_or(f64::NAN))
                        .collect()
                }
                Err(e) => {
                    errors.push(map_solver_error(&*e));
                    vec![f64::NAN; p.quantiles.len()]
                }
            };
            (results, x.len())
        }
    };
    Estimate {
        sequence_id,
        method: p.method,
        results,
        n,
        goodness_of_fit,
        errors,
    }
}
