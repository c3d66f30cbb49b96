#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Adaptive staircase engine.
//!
//! Each adaptive sequence is driven by a `SequenceController`: after every
//! completed trial the runner calls `advance`, which moves the sequence
//! through its procedure's transition table, computes the stimulus value and
//! step divisor of the sequence's next trial, applies range limits and
//! decides termination. After the run, `estimate` computes a threshold from
//! the collected trials.
//!
//! ## Architecture
//!
//! - **Policies**: `Procedure`, `StoppingRule`, `ResultMethod` (`procedure`)
//! - **Transitions**: fixed tables (`table`) and response resolution (`transition`)
//! - **Steps**: step-size model (`step`) and parameter fix-up (`fixup`)
//! - **Stopping**: turnpoint counting and termination (`stopping`)
//! - **Estimation**: means, psychometric fits and isotonic inversion (`estimate`)
//! - **Solvers**: Nelder–Mead over `argmin` (`simplex`) and pool-adjacent-violators (`isotonic`)
//! - **Registry**: one controller per sequence id (`registry`), driven by `runner`
//!
//! Nothing in the engine aborts a run: configuration, response and state
//! problems are reported through the controller's diagnostics and `tracing`,
//! and a defined fallback is used.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod estimate;
pub mod fixup;
pub mod isotonic;
pub mod procedure;
pub mod protocol;
pub mod psychometric;
pub mod registry;
pub mod runner;
pub mod simplex;
pub mod solver_error;
pub mod status;
pub mod step;
pub mod stopping;
pub mod table;
pub mod transition;
pub mod trial;

pub use builder::SequenceBuilder;
pub use config::{FitCfg, RunCfg, SequenceCfg};
pub use controller::SequenceController;
pub use error::{BuildError, Report, Result, SolverError, StaircaseError};
pub use estimate::Estimate;
pub use fixup::FixOutcome;
pub use isotonic::{Pava, StepCurve};
pub use procedure::{Procedure, Response, ResponseCodes, ResultMethod, Selector, StoppingRule};
pub use protocol::{FileProtocol, TracingSink};
pub use psychometric::PsychometricShape;
pub use registry::SequenceRegistry;
pub use runner::{RunSummary, run_trials};
pub use simplex::NelderMead;
pub use status::{AdvanceOutcome, AdvanceStatus, SequenceState};
pub use step::StepSize;
pub use table::is_turnpoint;
pub use trial::{TrialList, TrialRecord};
