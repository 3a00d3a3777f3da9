//! optimization — SSA objective and manifold conjugate-gradient optimizer.
//!
//! Purpose
//! -------
//! Provide everything needed to run one SSA optimization: the objective and
//! its projected gradient on the rotation group, χ² normalization, the
//! Armijo line search, Polak–Ribière directions, and the driver that ties
//! them together into a single run from a random or supplied start.
//!
//! Key behaviors
//! -------------
//! - `objective`: loss/gradient evaluation returning the rotated moments it
//!   computed, so accepted steps reuse them.
//! - `normalization`: degrees of freedom, `√(2·loss) − √(2k − 1)` and χ²
//!   survival probabilities.
//! - `line_search` / `conjugate`: step selection and search directions.
//! - `manifold`: [`manifold::optimize_once`].
//! - `finite_diff`: central-difference gradient check.
//! - `validation` / `errors`: shared checks and the [`errors::OptError`]
//!   surface.
//!
//! Invariants & assumptions
//! ------------------------
//! - Rotations are always `exp` of skew-symmetric generators; the demixing
//!   matrix is a rotation times the whitening matrix unless a start is
//!   supplied.
//! - Failures surface as `OptError`; nothing in this layer panics on bad
//!   input.
//!
//! Conventions
//! -----------
//! - Skew matrices use the inner product `½·Σ aᵢⱼbᵢⱼ` in the Armijo test and
//!   the norm `√(2·Σ aᵢⱼ²)` for direction normalization.
//! - Per-iteration diagnostics go to `tracing` at debug/trace level; this
//!   layer never writes to a `LogSink`.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its own rules; `finite_diff` validates the
//!   objective's gradient numerically; `manifold` recovers known axes from
//!   synthetic moments.

pub mod conjugate;
pub mod errors;
pub mod finite_diff;
pub mod line_search;
pub mod manifold;
pub mod normalization;
pub mod objective;
pub mod types;
pub mod validation;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::manifold::optimize_once;
    pub use super::objective::{Evaluation, Objective, RotatedMoments};
    pub use super::types::{MomentSet, RunConfig, RunOutcome, Subspace};
}
