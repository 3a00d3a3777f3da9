//! ssa::results — the decomposition returned by an SSA fit.
//!
//! Purpose
//! -------
//! Bundle the projections and bases of both subspaces with the diagnostics
//! of the phase(s) that produced them and the parameters used, so a fit can
//! be exported or audited without re-running it.
//!
//! Key behaviors
//! -------------
//! - `ps`/`pn` project data onto the stationary / non-stationary sources;
//!   `bs`/`bn` are the matching columns of `[Ps; Pn]⁻¹`.
//! - [`PhaseSummary`] carries the normalized loss of one phase together with
//!   its raw loss and χ² degrees of freedom, and converts them to a p-value.
//! - A phase that did not run (cancellation during phase 1, single-phase
//!   non-stationary mode) has no summary.
//!
//! Invariants & assumptions
//! ------------------------
//! - `[Ps; Pn]·[Bs Bn] = I` up to rounding.
//! - Non-stationary losses are reported with their natural sign: a larger
//!   value means more non-stationary.
use crate::{
    linalg::{
        errors::{LinalgError, LinalgResult},
        matrix::stack_rows,
    },
    optimization::{errors::OptResult, normalization::chi_square_p_value},
    ssa::params::SsaParameters,
};
use ndarray::{concatenate, Array2, ArrayView2, Axis};

/// How the decomposition was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Stationary phase followed by the seeded non-stationary phase.
    Iterative,
    /// Mean-only eigendecomposition.
    ClosedForm,
    /// Single-phase search for the non-stationary block.
    NonStationaryOnly,
}

/// Diagnostics of one optimization phase (its best restart).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSummary {
    /// Normalized loss `√(2·raw) − √(2k − 1)`.
    pub loss: f64,
    pub raw_loss: f64,
    pub dof: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl PhaseSummary {
    /// χ²ₖ survival probability of the raw loss.
    ///
    /// For the stationary phase a small value argues against stationarity
    /// of the estimated sources.
    pub fn p_value(&self) -> OptResult<f64> {
        chi_square_p_value(self.raw_loss, self.dof)
    }
}

/// Epoching actually used by the fit.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub count: usize,
    pub sizes: Vec<usize>,
    /// Ridge added to every epoch covariance, if any.
    pub regularization: Option<f64>,
}

/// Result of an SSA fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// `d×n` stationary projection.
    pub ps: Array2<f64>,
    /// `(n−d)×n` non-stationary projection.
    pub pn: Array2<f64>,
    /// `n×d` stationary basis.
    pub bs: Array2<f64>,
    /// `n×(n−d)` non-stationary basis.
    pub bn: Array2<f64>,
    pub stationary: Option<PhaseSummary>,
    pub non_stationary: Option<PhaseSummary>,
    pub epochs: EpochSummary,
    pub method: SolveMethod,
    pub parameters: SsaParameters,
    /// A stop request cut the restart loop short.
    pub cancelled: bool,
}

impl Decomposition {
    pub fn dims(&self) -> usize {
        self.ps.ncols()
    }

    /// `[Ps; Pn]`.
    pub fn demixing(&self) -> LinalgResult<Array2<f64>> {
        stack_rows(self.ps.view(), self.pn.view())
    }

    /// `[Bs Bn]`.
    pub fn mixing(&self) -> LinalgResult<Array2<f64>> {
        concatenate(Axis(1), &[self.bs.view(), self.bn.view()]).map_err(|_| {
            LinalgError::DimensionMismatch { context: "mixing", left: self.bs.dim(), right: self.bn.dim() }
        })
    }

    /// Stationary sources `Ps·X` of a dimensions × time matrix.
    ///
    /// # Errors
    /// [`LinalgError::DimensionMismatch`] if `x` does not have `n` rows.
    pub fn stationary_sources(&self, x: ArrayView2<f64>) -> LinalgResult<Array2<f64>> {
        project(&self.ps, x, "stationary_sources")
    }

    /// Non-stationary sources `Pn·X`.
    ///
    /// # Errors
    /// [`LinalgError::DimensionMismatch`] if `x` does not have `n` rows.
    pub fn non_stationary_sources(&self, x: ArrayView2<f64>) -> LinalgResult<Array2<f64>> {
        project(&self.pn, x, "non_stationary_sources")
    }
}

fn project(p: &Array2<f64>, x: ArrayView2<f64>, context: &'static str) -> LinalgResult<Array2<f64>> {
    if p.ncols() != x.nrows() {
        return Err(LinalgError::DimensionMismatch { context, left: p.dim(), right: x.dim() });
    }
    Ok(p.dot(&x))
}
