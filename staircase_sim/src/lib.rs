//! Simulated observers for driving staircase runs without a subject.

pub mod error;

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use staircase_traits::Observer;

use crate::error::{Result, SimError};

/// Codes an observer answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keys {
    pub yes: i64,
    pub no: i64,
}

impl Default for Keys {
    fn default() -> Self {
        Self { yes: 1, no: 2 }
    }
}

/// Says yes exactly when the stimulus is at or above the threshold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdObserver {
    threshold: f64,
    keys: Keys,
}

impl ThresholdObserver {
    pub fn new(threshold: f64, keys: Keys) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(SimError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold, keys })
    }
}

impl Observer for ThresholdObserver {
    fn respond(
        &mut self,
        _sequence_id: i64,
        parameter_value: f64,
    ) -> std::result::Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(if parameter_value >= self.threshold {
            self.keys.yes
        } else {
            self.keys.no
        })
    }
}

/// Answers yes with logistic probability around `threshold`.
///
/// `spread` is the logistic scale; 0 degenerates to `ThresholdObserver`.
/// Draws come from a seeded ChaCha stream, so a run is reproducible.
#[derive(Debug, Clone)]
pub struct PsychometricObserver {
    threshold: f64,
    spread: f64,
    keys: Keys,
    rng: ChaCha8Rng,
}

impl PsychometricObserver {
    pub fn new(threshold: f64, spread: f64, seed: u64, keys: Keys) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(SimError::InvalidThreshold(threshold));
        }
        if !(spread.is_finite() && spread >= 0.0) {
            return Err(SimError::InvalidSpread(spread));
        }
        Ok(Self {
            threshold,
            spread,
            keys,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Probability of a yes at `x`.
    pub fn p_yes(&self, x: f64) -> f64 {
        if self.spread == 0.0 {
            return if x >= self.threshold { 1.0 } else { 0.0 };
        }
        1.0 / (1.0 + (-(x - self.threshold) / self.spread).exp())
    }
}

impl Observer for PsychometricObserver {
    fn respond(
        &mut self,
        sequence_id: i64,
        parameter_value: f64,
    ) -> std::result::Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let p = self.p_yes(parameter_value);
        let draw: f64 = self.rng.gen_range(0.0..1.0);
        let yes = draw < p;
        tracing::trace!(sequence_id, parameter_value, p, yes, "simulated response");
        Ok(if yes { self.keys.yes } else { self.keys.no })
    }
}

/// Replays a fixed list of raw response codes, in order, across all sequences.
#[derive(Debug, Clone, Default)]
pub struct ScriptedObserver {
    script: VecDeque<i64>,
    served: usize,
}

impl ScriptedObserver {
    pub fn new(script: impl IntoIterator<Item = i64>) -> Self {
        Self {
            script: script.into_iter().collect(),
            served: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Observer for ScriptedObserver {
    fn respond(
        &mut self,
        _sequence_id: i64,
        _parameter_value: f64,
    ) -> std::result::Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let code = self
            .script
            .pop_front()
            .ok_or(SimError::ScriptExhausted(self.served))?;
        self.served += 1;
        Ok(code)
    }
}
