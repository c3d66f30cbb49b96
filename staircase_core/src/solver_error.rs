//! Maps `Box<dyn Error>` from the collaborator traits to `StaircaseError`.
//!
//! The traits in `staircase_traits` use `Box<dyn Error + Send + Sync>` so any
//! solver can be plugged in; errors from the built-in solvers are recognized
//! by downcasting, anything else is carried as text.

use crate::error::{SolverError, StaircaseError};

/// Map a trait-boundary error to a typed `StaircaseError::Solver`.
pub fn map_solver_error(e: &(dyn std::error::Error + 'static)) -> StaircaseError {
    if let Some(known) = e.downcast_ref::<SolverError>() {
        return StaircaseError::Solver(known.to_string());
    }
    StaircaseError::Solver(format!("external solver: {e}"))
}
