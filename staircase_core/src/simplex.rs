//! Nelder–Mead minimizer backed by `argmin`.
//!
//! The initial simplex perturbs each coordinate by 5%, or by 0.00025 when the
//! coordinate is zero. Iteration stops when the standard deviation of the
//! objective over the simplex falls under `tolerance`, or after
//! `max_iterations`.

use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead as Simplex;
use staircase_traits::Minimizer;

use crate::error::SolverError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-8,
        }
    }
}

impl From<&crate::config::FitCfg> for NelderMead {
    fn from(c: &crate::config::FitCfg) -> Self {
        Self {
            max_iterations: c.max_iterations,
            tolerance: c.tolerance,
        }
    }
}

/// Borrowed objective seen through argmin's problem interface.
struct Objective<'a>(&'a dyn Fn(&[f64]) -> f64);

impl CostFunction for Objective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        let v = (self.0)(p);
        // the simplex is ordered by cost, NaN would break the ordering
        Ok(if v.is_nan() { f64::INFINITY } else { v })
    }
}

fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(start.len() + 1);
    vertices.push(start.to_vec());
    for i in 0..start.len() {
        let mut p = start.to_vec();
        p[i] = if p[i] == 0.0 { 0.00025 } else { p[i] * 1.05 };
        vertices.push(p);
    }
    vertices
}

impl NelderMead {
    pub fn run(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        start: &[f64],
    ) -> Result<Vec<f64>, SolverError> {
        if start.is_empty() {
            return Err(SolverError::EmptyStart);
        }
        if start.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFiniteStart);
        }

        let backend = |e: ArgminError| SolverError::Backend(e.to_string());
        let solver = Simplex::new(initial_simplex(start))
            .with_sd_tolerance(self.tolerance)
            .map_err(backend)?;
        let res = Executor::new(Objective(objective), solver)
            .configure(|state| state.max_iters(u64::from(self.max_iterations)))
            .run()
            .map_err(backend)?;

        let state = res.state();
        tracing::trace!(
            iterations = state.get_iter(),
            cost = state.get_best_cost(),
            "simplex finished"
        );
        state
            .get_best_param()
            .cloned()
            .ok_or_else(|| SolverError::Backend("no best point recorded".into()))
    }
}

impl Minimizer for NelderMead {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        start: &[f64],
    ) -> Result<Vec<f64>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.run(objective, start)?)
    }
}
