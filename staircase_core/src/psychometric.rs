//! Psychometric function shapes and the two fitting objectives.
//!
//! All three shapes are parameterized so that the core function passes 0.5
//! at `pse`; `jnd` sets the spread. Weibull is only defined for positive
//! stimuli and uses `pse / jnd` as its shape exponent.

use std::f64::consts::LN_2;

use crate::procedure::ResultMethod;

/// Objective value for parameters outside the model's domain.
const PENALTY: f64 = 1e12;
/// Probabilities are clamped away from 0 and 1 in the likelihood.
const P_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsychometricShape {
    Logistic,
    Weibull,
    Gumbel,
}

impl PsychometricShape {
    pub const fn for_method(method: ResultMethod) -> Option<Self> {
        match method {
            ResultMethod::Logistic => Some(Self::Logistic),
            ResultMethod::Weibull => Some(Self::Weibull),
            ResultMethod::Gumbel => Some(Self::Gumbel),
            _ => None,
        }
    }

    pub fn admits(self, pse: f64, jnd: f64) -> bool {
        let finite = pse.is_finite() && jnd.is_finite() && jnd > 0.0;
        match self {
            Self::Weibull => finite && pse > 0.0,
            Self::Logistic | Self::Gumbel => finite,
        }
    }

    /// Core function value in [0, 1].
    pub fn cdf(self, x: f64, pse: f64, jnd: f64) -> f64 {
        match self {
            Self::Logistic => 1.0 / (1.0 + (-(x - pse) / jnd).exp()),
            Self::Gumbel => 1.0 - (-LN_2 * ((x - pse) / jnd).exp()).exp(),
            Self::Weibull => {
                if x <= 0.0 {
                    0.0
                } else {
                    1.0 - (-LN_2 * (x / pse).powf(pse / jnd)).exp()
                }
            }
        }
    }
}

/// A shape together with its asymptotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Psychometric {
    pub shape: PsychometricShape,
    pub guess_rate: f64,
    pub lapse_rate: f64,
}

impl Psychometric {
    pub fn probability(&self, x: f64, pse: f64, jnd: f64) -> f64 {
        let span = 1.0 - self.guess_rate - self.lapse_rate;
        span.mul_add(self.shape.cdf(x, pse, jnd), self.guess_rate)
    }

    pub fn least_squares(&self, params: &[f64], x: &[f64], r: &[f64]) -> f64 {
        let [pse, jnd] = params else {
            return PENALTY;
        };
        if !self.shape.admits(*pse, *jnd) {
            return PENALTY;
        }
        x.iter()
            .zip(r)
            .map(|(xi, ri)| (ri - self.probability(*xi, *pse, *jnd)).powi(2))
            .sum()
    }

    pub fn neg_log_likelihood(&self, params: &[f64], x: &[f64], r: &[f64]) -> f64 {
        let [pse, jnd] = params else {
            return PENALTY;
        };
        if !self.shape.admits(*pse, *jnd) {
            return PENALTY;
        }
        -x.iter()
            .zip(r)
            .map(|(xi, ri)| {
                let p = self.probability(*xi, *pse, *jnd).clamp(P_EPS, 1.0 - P_EPS);
                ri * p.ln() + (1.0 - ri) * (1.0 - p).ln()
            })
            .sum::<f64>()
    }
}
