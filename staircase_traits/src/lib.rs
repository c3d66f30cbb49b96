//! Collaborator seams for the staircase engine.
//!
//! The engine itself never does numerical optimization, regression or I/O on
//! its own; everything it needs from the outside world goes through the traits
//! in this crate. Errors cross the boundary as `Box<dyn Error + Send + Sync>`
//! and are mapped to typed errors by `staircase_core`.

pub mod protocol;

pub use protocol::{MemorySink, NullSink, ProtocolSink};

/// Derivative-free multivariate minimizer.
///
/// Given an objective and a start point, returns a locally optimal point.
/// Implementations must be deterministic for a deterministic objective and
/// start point; no global optimum is promised.
pub trait Minimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        start: &[f64],
    ) -> Result<Vec<f64>, Box<dyn std::error::Error + Send + Sync>>;
}

/// A fitted non-decreasing step function of response probability over stimulus.
pub trait MonotoneCurve {
    /// Fitted probability at stimulus `x`.
    fn value_at(&self, x: f64) -> f64;
    /// Stimulus at which the fitted probability equals `q`, if the curve reaches it.
    fn inverse(&self, q: f64) -> Option<f64>;
    /// Goodness-of-fit statistic of the fit (smaller is better).
    fn goodness_of_fit(&self) -> f64;
}

/// Monotone (isotonic) regression solver over binary responses.
pub trait MonotoneRegression {
    type Curve: MonotoneCurve;

    /// Fit `r` (0/1) against `x`; both slices have the same length.
    fn fit(
        &self,
        x: &[f64],
        r: &[f64],
    ) -> Result<Self::Curve, Box<dyn std::error::Error + Send + Sync>>;
}

/// Anything that can answer a trial: a subject, a simulated observer, a replay.
///
/// Returns the raw response code; classification into yes/no/stop is done by
/// the engine with the run's response codes.
pub trait Observer {
    fn respond(
        &mut self,
        sequence_id: i64,
        parameter_value: f64,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;
}
