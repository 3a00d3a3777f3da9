//! ssa::closed_form — mean-only SSA by a single eigendecomposition.
//!
//! Purpose
//! -------
//! When only epoch means are compared, the loss of a projection `P` is the
//! weighted drift `Σᵢ eᵢ‖P(μᵢ − μ)‖²`, which is minimized by the eigenvectors
//! of `H = Σᵢ eᵢ(μᵢ − μ)(μᵢ − μ)ᵀ` with the smallest eigenvalues.
//!
//! Key behaviors
//! -------------
//! - The `d` eigenvectors with the smallest eigenvalues form `Ps`; the rest
//!   form `Pn`. Eigenvalues are sorted ascending by the provider.
//! - Raw losses are the eigenvalue sums of each block, so together they add
//!   up to `trace(H)`. Reported losses are normalized with `k = epochs·d`
//!   and `k = epochs·(n − d)`.
//! - Always one iteration, always converged. The data are not whitened.
use crate::{
    linalg::backend::LinearAlgebra,
    moments::estimator::EpochStatistics,
    optimization::{
        normalization::{degrees_of_freedom, reported_loss},
        types::MomentSet,
    },
    ssa::{
        errors::SsaResult,
        results::PhaseSummary,
    },
};
use ndarray::{s, Array2, Axis};

/// Output of [`solve_mean_only`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedFormSolution {
    pub ps: Array2<f64>,
    pub pn: Array2<f64>,
    pub bs: Array2<f64>,
    pub bn: Array2<f64>,
    pub stationary: PhaseSummary,
    pub non_stationary: PhaseSummary,
}

/// Weighted scatter of the epoch means around the pooled mean.
pub fn mean_scatter(stats: &EpochStatistics) -> Array2<f64> {
    let n = stats.dims();
    let mut h = Array2::<f64>::zeros((n, n));
    for (mean, &size) in stats.means().iter().zip(stats.sizes()) {
        let centered = (mean - stats.pooled_mean()).insert_axis(Axis(1));
        h.scaled_add(size as f64, &centered.dot(&centered.t()));
    }
    h
}

/// solve_mean_only — closed-form stationary / non-stationary split.
///
/// Parameters
/// ----------
/// - `la`: provider for the symmetric eigendecomposition.
/// - `stats`: epoch moments; only means and sizes are read.
/// - `stationary_sources`: `d`, already checked to satisfy `1 ≤ d < n`.
///
/// Errors
/// ------
/// - `SsaError::Linalg` if the eigendecomposition fails.
pub fn solve_mean_only<L: LinearAlgebra + ?Sized>(
    la: &L, stats: &EpochStatistics, stationary_sources: usize,
) -> SsaResult<ClosedFormSolution> {
    let n = stats.dims();
    let d = stationary_sources;
    let eig = la.symmetric_eigen(&mean_scatter(stats))?;

    let raw_s: f64 = eig.eigenvalues.slice(s![..d]).sum();
    let raw_n: f64 = eig.eigenvalues.slice(s![d..]).sum();
    let k_s = degrees_of_freedom(stats.epochs(), d, MomentSet::MeanOnly);
    let k_n = degrees_of_freedom(stats.epochs(), n - d, MomentSet::MeanOnly);

    let basis = &eig.eigenvectors;
    let projections = basis.t();
    Ok(ClosedFormSolution {
        ps: projections.slice(s![..d, ..]).to_owned(),
        pn: projections.slice(s![d.., ..]).to_owned(),
        bs: basis.slice(s![.., ..d]).to_owned(),
        bn: basis.slice(s![.., d..]).to_owned(),
        stationary: PhaseSummary {
            loss: reported_loss(raw_s, k_s),
            raw_loss: raw_s,
            dof: k_s,
            iterations: 1,
            converged: true,
        },
        non_stationary: PhaseSummary {
            loss: reported_loss(raw_n, k_n),
            raw_loss: raw_n,
            dof: k_n,
            iterations: 1,
            converged: true,
        },
    })
}
