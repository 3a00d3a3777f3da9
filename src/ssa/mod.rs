//! ssa — Stationary Subspace Analysis orchestration.
//!
//! Purpose
//! -------
//! Provide the user-facing SSA fit: parameters, the solver that drives the
//! moment estimator and optimizers, the decomposition it returns and the
//! stop token used to interrupt it.
//!
//! Key behaviors
//! -------------
//! - [`solver::Ssa`] validates configuration up front, estimates epoch
//!   moments and runs the dual-phase iterative search, the mean-only closed
//!   form, or the single-phase non-stationary search.
//! - [`results::Decomposition`] holds `Ps`, `Pn`, `Bs`, `Bn` plus phase
//!   diagnostics and the parameters used.
//!
//! Invariants & assumptions
//! ------------------------
//! - A fit is single-threaded; cancellation is cooperative and takes effect
//!   between restarts only.
//!
//! Testing notes
//! -------------
//! - Unit tests per submodule; full pipelines, including cancellation, are
//!   in `tests/integration_ssa_pipeline.rs`.

pub mod cancel;
pub mod closed_form;
pub mod errors;
pub mod params;
pub mod results;
pub mod solver;

pub mod prelude {
    pub use super::cancel::CancellationToken;
    pub use super::errors::{SsaError, SsaResult};
    pub use super::params::{PrimaryTarget, SsaParameters, DEFAULT_RESTARTS};
    pub use super::results::{Decomposition, EpochSummary, PhaseSummary, SolveMethod};
    pub use super::solver::Ssa;
}
