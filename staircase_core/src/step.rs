//! Step-size model: base step divided by a running divisor, with a floor.

/// Step constants of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSize {
    /// Base step, divided by the step divisor.
    pub base: f64,
    /// Smallest magnitude a step may take.
    pub floor: f64,
    /// Added to the divisor after a reversal.
    pub increment: f64,
    /// Subtracted from the divisor on a run; also the divisor's floor.
    pub decrement: f64,
    /// Scale applied to upward steps.
    pub upward_factor: f64,
}

impl Default for StepSize {
    fn default() -> Self {
        Self {
            base: 1.0,
            floor: 0.125,
            increment: 1.0,
            decrement: 1.0,
            upward_factor: 1.0,
        }
    }
}

impl StepSize {
    /// Step magnitude for `divisor` and whether the floor was hit.
    pub fn step(&self, divisor: f64) -> (f64, bool) {
        let s = self.base / divisor;
        if s.abs() > self.floor.abs() {
            (s, false)
        } else {
            (self.floor, true)
        }
    }

    /// Divisor after a run of same-direction steps; never below `decrement`.
    pub fn decrement(&self, divisor: f64) -> f64 {
        (divisor - self.decrement).max(self.decrement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halving_divisors_reach_the_floor() {
        let model = StepSize {
            base: 8.0,
            floor: 1.0,
            ..StepSize::default()
        };
        let got: Vec<(f64, bool)> = [1.0, 2.0, 4.0, 8.0, 16.0]
            .into_iter()
            .map(|d| model.step(d))
            .collect();
        assert_eq!(
            got,
            vec![
                (8.0, false),
                (4.0, false),
                (2.0, false),
                (1.0, true),
                (1.0, true)
            ]
        );
    }

    #[test]
    fn decrement_is_floored() {
        let model = StepSize {
            decrement: 0.5,
            ..StepSize::default()
        };
        assert_eq!(model.decrement(3.0), 2.5);
        assert_eq!(model.decrement(0.7), 0.5);
        assert_eq!(model.decrement(0.1), 0.5);
    }
}
