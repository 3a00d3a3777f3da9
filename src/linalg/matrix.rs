//! linalg::matrix — small dense-matrix helpers shared across the crate.
//!
//! Everything here is plain `ndarray` arithmetic; decompositions live in
//! [`crate::linalg::backend`].
use crate::linalg::errors::{LinalgError, LinalgResult};
use ndarray::{concatenate, Array2, ArrayView2, Axis};

/// Σᵢⱼ aᵢⱼ·bᵢⱼ.
pub fn frobenius_dot(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Canonical inner product on skew-symmetric matrices, `½·Σᵢⱼ aᵢⱼ·bᵢⱼ`.
///
/// Used for the sufficient-decrease test of the manifold line search.
pub fn skew_inner(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    0.5 * frobenius_dot(a, b)
}

/// `a − aᵀ`.
pub fn skew(a: &Array2<f64>) -> Array2<f64> {
    a - &a.t()
}

/// `½·(a + aᵀ)`; removes round-off asymmetry before eigendecompositions.
pub fn symmetrize(a: &Array2<f64>) -> Array2<f64> {
    (a + &a.t()) * 0.5
}

/// Stack `top` above `bottom`.
///
/// Both views share one lifetime, as `concatenate` takes a slice of a
/// single view type.
///
/// # Errors
/// [`LinalgError::DimensionMismatch`] when the column counts differ.
pub fn stack_rows<'a>(top: ArrayView2<'a, f64>, bottom: ArrayView2<'a, f64>) -> LinalgResult<Array2<f64>> {
    concatenate(Axis(0), &[top, bottom]).map_err(|_| LinalgError::DimensionMismatch {
        context: "stack_rows",
        left: top.dim(),
        right: bottom.dim(),
    })
}

/// Largest absolute entry of `a − b`.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.iter()).fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
}
