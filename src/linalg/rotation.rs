//! linalg::rotation — random rotations and the whitening transform.
//!
//! Purpose
//! -------
//! Produce the two square matrices the optimizer starts from: a uniformly
//! scrambled rotation `exp(M − Mᵀ)` used to randomize restarts, and the
//! symmetric whitening matrix `W = V·Λ^(−1/2)·Vᵀ` of the pooled covariance.
//! [`orthonormalize_rows`] maps an arbitrary invertible start back onto the
//! orthogonal group.
//!
//! Invariants & assumptions
//! ------------------------
//! - Generator entries are drawn from U(0,1) − 0.5 before antisymmetrization.
//! - Whitening requires a strictly positive spectrum; a zero or negative
//!   eigenvalue is reported as `NotPositiveDefinite` rather than producing
//!   infinities.
use crate::linalg::{
    backend::LinearAlgebra,
    errors::{LinalgError, LinalgResult},
    matrix::skew,
};
use ndarray::Array2;
use rand::Rng;

/// Random skew-symmetric `n×n` generator.
pub fn random_skew<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Array2<f64> {
    let m = Array2::from_shape_fn((n, n), |_| rng.gen::<f64>() - 0.5);
    skew(&m)
}

/// Random `n×n` rotation `exp(M − Mᵀ)`.
///
/// # Errors
/// Propagates failures of the provider's `expm`.
pub fn random_rotation<L, R>(la: &L, n: usize, rng: &mut R) -> LinalgResult<Array2<f64>>
where
    L: LinearAlgebra + ?Sized,
    R: Rng + ?Sized,
{
    la.expm(&random_skew(n, rng))
}

/// Relative norm below which a Gram–Schmidt residual counts as dependent.
const DEPENDENT_ROW_TOL: f64 = 1e-10;

/// orthonormalize_rows — modified Gram–Schmidt on the rows of `a`.
///
/// Row `i` of the result spans the same space as rows `0..=i` of `a`
/// minus rows `0..i`, so every leading block of rows keeps its span.
///
/// Errors
/// ------
/// - `LinalgError::NonFinite` if `a` contains NaN or ±∞.
/// - `LinalgError::Singular` if a row is (numerically) a combination of the
///   rows above it.
pub fn orthonormalize_rows(a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    if a.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite { context: "orthonormalize_rows" });
    }
    let mut q = a.clone();
    for i in 0..q.nrows() {
        let original = q.row(i).dot(&q.row(i)).sqrt();
        for j in 0..i {
            let proj = q.row(i).dot(&q.row(j));
            let basis = q.row(j).to_owned();
            q.row_mut(i).scaled_add(-proj, &basis);
        }
        let norm = q.row(i).dot(&q.row(i)).sqrt();
        if norm <= DEPENDENT_ROW_TOL * original || norm == 0.0 {
            return Err(LinalgError::Singular { context: "orthonormalize_rows" });
        }
        q.row_mut(i).mapv_inplace(|v| v / norm);
    }
    Ok(q)
}

/// whitening — inverse symmetric square root of a covariance matrix.
///
/// Parameters
/// ----------
/// - `la`: provider used for the eigendecomposition.
/// - `cov`: symmetric positive-definite `n×n` matrix.
///
/// Returns
/// -------
/// `W = V·Λ^(−1/2)·Vᵀ`, so that `W·cov·Wᵀ = I`.
///
/// Errors
/// ------
/// - `LinalgError::NotPositiveDefinite` if any eigenvalue is `≤ 0`.
/// - Any error raised by `symmetric_eigen`.
pub fn whitening<L: LinearAlgebra + ?Sized>(la: &L, cov: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    let eig = la.symmetric_eigen(cov)?;
    if eig.eigenvalues.iter().any(|&v| v <= 0.0) {
        return Err(LinalgError::NotPositiveDefinite { context: "whitening" });
    }
    let scale = eig.eigenvalues.mapv(|v| v.powf(-0.5));
    let v = &eig.eigenvectors;
    // V·diag(s) scales the columns of V.
    let scaled = v * &scale;
    Ok(scaled.dot(&v.t()))
}
