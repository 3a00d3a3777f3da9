//! optimization::normalization — χ²-based scaling of the SSA objective.
//!
//! Purpose
//! -------
//! Put losses from different dimensions and epoch counts on a common
//! scale. Under stationarity the raw objective behaves like a χ²ₖ variable,
//! so the optimizer works with Fisher's approximation
//! `√(2·loss) − √(2k − 1)`, which is roughly standard normal.
//!
//! Key behaviors
//! -------------
//! - [`degrees_of_freedom`]: `k = epochs·d·(d+3)/2` with both moments,
//!   `epochs·d·(d+1)/2` with covariances only, `epochs·d` with means only.
//! - [`normalize_loss`] / [`normalize_gradient`] apply the transform and its
//!   chain-rule factor `1/√(2·loss)`.
//! - [`reported_loss`] is the transform of a raw loss clamped at zero, for
//!   results and summaries.
//! - [`chi_square_p_value`] evaluates the χ²ₖ survival function via
//!   `statrs`.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`normalize_loss`] is NaN for a negative raw loss, so a comparison
//!   against it fails. Only [`reported_loss`] clamps.
//! - [`normalize_gradient`] is only meaningful for a strictly positive raw
//!   loss; the optimizer stops before calling it otherwise.
use crate::optimization::{
    errors::{OptError, OptResult},
    types::MomentSet,
};
use ndarray::Array2;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Degrees of freedom of the χ² reference for `dim` optimized rows.
pub fn degrees_of_freedom(epochs: usize, dim: usize, moments: MomentSet) -> usize {
    match moments {
        MomentSet::Both => epochs * dim * (dim + 3) / 2,
        MomentSet::CovarianceOnly => epochs * dim * (dim + 1) / 2,
        MomentSet::MeanOnly => epochs * dim,
    }
}

/// `√(2·loss) − √(2k − 1)`; NaN when `raw < 0`.
pub fn normalize_loss(raw: f64, dof: usize) -> f64 {
    (2.0 * raw).sqrt() - (2.0 * dof as f64 - 1.0).sqrt()
}

/// [`normalize_loss`] of `max(raw, 0)`, the value stored in results.
pub fn reported_loss(raw: f64, dof: usize) -> f64 {
    normalize_loss(raw.max(0.0), dof)
}

/// Gradient of [`normalize_loss`] given the raw gradient and `raw > 0`.
pub fn normalize_gradient(grad: &Array2<f64>, raw: f64) -> Array2<f64> {
    grad / (2.0 * raw).sqrt()
}

/// Inverse of [`normalize_loss`] on its range.
pub fn raw_from_normalized(loss: f64, dof: usize) -> f64 {
    let root = loss + (2.0 * dof as f64 - 1.0).sqrt();
    0.5 * root.max(0.0).powi(2)
}

/// P(χ²ₖ ≥ raw).
///
/// # Errors
/// [`OptError::InvalidDegreesOfFreedom`] when `dof` is zero.
pub fn chi_square_p_value(raw: f64, dof: usize) -> OptResult<f64> {
    let dist = ChiSquared::new(dof as f64).map_err(|_| OptError::InvalidDegreesOfFreedom { dof })?;
    Ok(dist.sf(raw.max(0.0)))
}
