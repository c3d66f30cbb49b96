//! Pool-adjacent-violators isotonic regression over binary responses.

use staircase_traits::{MonotoneCurve, MonotoneRegression};

use crate::error::SolverError;

/// The pool-adjacent-violators solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pava;

/// Non-decreasing fit at the distinct stimulus values.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCurve {
    xs: Vec<f64>,
    ps: Vec<f64>,
    rss: f64,
}

impl StepCurve {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ps.iter().copied())
    }
}

struct Block {
    sum: f64,
    weight: f64,
    /// Number of distinct stimulus values pooled in this block.
    groups: usize,
}

impl Block {
    fn mean(&self) -> f64 {
        self.sum / self.weight
    }
}

impl Pava {
    pub fn solve(&self, x: &[f64], r: &[f64]) -> Result<StepCurve, SolverError> {
        if x.len() != r.len() {
            return Err(SolverError::LengthMismatch {
                x: x.len(),
                r: r.len(),
            });
        }
        if x.is_empty() {
            return Err(SolverError::NoData);
        }

        let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(r.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Pool ties first so every distinct x gets one fitted value.
        let mut xs: Vec<f64> = Vec::new();
        let mut blocks: Vec<Block> = Vec::new();
        for (xi, ri) in &pairs {
            if xs.last() == Some(xi)
                && let Some(last) = blocks.last_mut()
            {
                last.sum += ri;
                last.weight += 1.0;
                continue;
            }
            xs.push(*xi);
            blocks.push(Block {
                sum: *ri,
                weight: 1.0,
                groups: 1,
            });
        }

        let mut pooled: Vec<Block> = Vec::with_capacity(blocks.len());
        for b in blocks {
            pooled.push(b);
            while pooled.len() > 1 {
                let n = pooled.len();
                if pooled[n - 2].mean() <= pooled[n - 1].mean() {
                    break;
                }
                if let Some(top) = pooled.pop()
                    && let Some(prev) = pooled.last_mut()
                {
                    prev.sum += top.sum;
                    prev.weight += top.weight;
                    prev.groups += top.groups;
                }
            }
        }

        let ps: Vec<f64> = pooled
            .iter()
            .flat_map(|b| std::iter::repeat_n(b.mean(), b.groups))
            .collect();

        let rss = pairs
            .iter()
            .map(|(xi, ri)| {
                let i = xs.partition_point(|v| v < xi);
                (ri - ps[i]).powi(2)
            })
            .sum();

        Ok(StepCurve { xs, ps, rss })
    }
}

impl MonotoneRegression for Pava {
    type Curve = StepCurve;

    fn fit(
        &self,
        x: &[f64],
        r: &[f64],
    ) -> Result<StepCurve, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.solve(x, r)?)
    }
}

impl MonotoneCurve for StepCurve {
    fn value_at(&self, x: f64) -> f64 {
        let i = self.xs.partition_point(|v| *v <= x);
        self.ps[i.saturating_sub(1)]
    }

    /// Linear interpolation between neighbouring fitted points.
    fn inverse(&self, q: f64) -> Option<f64> {
        let i = self.ps.iter().position(|p| *p >= q)?;
        if i == 0 {
            return (self.ps[0] == q).then_some(self.xs[0]);
        }
        let (x0, p0) = (self.xs[i - 1], self.ps[i - 1]);
        let (x1, p1) = (self.xs[i], self.ps[i]);
        Some(x0 + (q - p0) / (p1 - p0) * (x1 - x0))
    }

    fn goodness_of_fit(&self) -> f64 {
        self.rss
    }
}
