//! linalg::backend — the injected linear-algebra provider.
//!
//! Purpose
//! -------
//! Define the small set of decompositions the SSA pipeline needs
//! (Cholesky, symmetric eigendecomposition, general solve, matrix
//! exponential) behind the [`LinearAlgebra`] trait, and supply the default
//! [`NalgebraBackend`] implementation.
//!
//! Key behaviors
//! -------------
//! - Storage everywhere in the crate is `ndarray::Array2<f64>`; the
//!   nalgebra backend copies operands into `DMatrix<f64>` for the
//!   factorization and copies results back.
//! - Derived operations (`inverse`, `inverse_spd`, `log_det_spd`) are
//!   provided methods built on the four required primitives, so an
//!   alternative backend only has to implement those.
//!
//! Invariants & assumptions
//! ------------------------
//! - `symmetric_eigen` returns eigenvalues in ascending order with the
//!   matching eigenvectors in the columns of `eigenvectors`.
//! - `cholesky` returns the lower factor `L` with `A = L·Lᵀ`.
//! - Every result is checked for finiteness before it is handed back.
//!
//! Downstream usage
//! ----------------
//! - `Ssa<L: LinearAlgebra>` owns a provider and lends it to the moment
//!   estimator, the objective and the closed-form solver. Nothing in the
//!   crate reaches for a process-wide backend.
use crate::linalg::errors::{LinalgError, LinalgResult};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Ascending eigendecomposition of a symmetric matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricEigen {
    pub eigenvalues: Array1<f64>,
    /// Column `k` is the unit eigenvector for `eigenvalues[k]`.
    pub eigenvectors: Array2<f64>,
}

/// LinearAlgebra — decompositions consumed by the SSA pipeline.
///
/// Purpose
/// -------
/// Decouple the numerical kernels from a concrete matrix library so that a
/// caller can swap in an instrumented or accelerated implementation.
///
/// Errors
/// ------
/// - [`LinalgError::NotSquare`] / [`LinalgError::DimensionMismatch`] for
///   malformed operands.
/// - [`LinalgError::NotPositiveDefinite`] when a Cholesky factor does not
///   exist.
/// - [`LinalgError::Singular`] when `solve` has no unique solution.
/// - [`LinalgError::NonFinite`] when an operand or result holds NaN/±∞.
pub trait LinearAlgebra: Send + Sync {
    /// Lower Cholesky factor `L` of a symmetric positive-definite `a`.
    fn cholesky(&self, a: &Array2<f64>) -> LinalgResult<Array2<f64>>;

    /// Eigendecomposition of a symmetric `a`, eigenvalues ascending.
    fn symmetric_eigen(&self, a: &Array2<f64>) -> LinalgResult<SymmetricEigen>;

    /// Solution `X` of `a·X = b`.
    fn solve(&self, a: &Array2<f64>, b: &Array2<f64>) -> LinalgResult<Array2<f64>>;

    /// Matrix exponential of a square `a`.
    fn expm(&self, a: &Array2<f64>) -> LinalgResult<Array2<f64>>;

    /// General inverse via `solve(a, I)`.
    fn inverse(&self, a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
        let n = square_dim(a, "inverse")?;
        self.solve(a, &Array2::eye(n))
    }

    /// Inverse of a symmetric positive-definite matrix through its Cholesky
    /// factor: `A⁻¹ = L⁻ᵀ·L⁻¹`.
    fn inverse_spd(&self, a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
        let l = self.cholesky(a)?;
        let l_inv = self.solve(&l, &Array2::eye(l.nrows()))?;
        Ok(l_inv.t().dot(&l_inv))
    }

    /// `ln det(a)` of a symmetric positive-definite matrix, taken as the log
    /// of the squared product of the Cholesky diagonal.
    fn log_det_spd(&self, a: &Array2<f64>) -> LinalgResult<f64> {
        let l = self.cholesky(a)?;
        Ok(2.0 * l.diag().iter().map(|v| v.ln()).sum::<f64>())
    }
}

/// Default provider backed by `nalgebra`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NalgebraBackend;

impl LinearAlgebra for NalgebraBackend {
    fn cholesky(&self, a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
        square_dim(a, "cholesky")?;
        ensure_finite(a, "cholesky")?;
        let chol = to_dmatrix(a)
            .cholesky()
            .ok_or(LinalgError::NotPositiveDefinite { context: "cholesky" })?;
        finite_or(from_dmatrix(&chol.l()), "cholesky")
    }

    fn symmetric_eigen(&self, a: &Array2<f64>) -> LinalgResult<SymmetricEigen> {
        let n = square_dim(a, "symmetric_eigen")?;
        ensure_finite(a, "symmetric_eigen")?;
        let eig = to_dmatrix(a).symmetric_eigen();

        // nalgebra leaves the spectrum unordered.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

        let eigenvalues = Array1::from_iter(order.iter().map(|&k| eig.eigenvalues[k]));
        let eigenvectors = Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, order[j])]);
        ensure_finite(&eigenvectors, "symmetric_eigen")?;
        if eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite { context: "symmetric_eigen" });
        }
        Ok(SymmetricEigen { eigenvalues, eigenvectors })
    }

    fn solve(&self, a: &Array2<f64>, b: &Array2<f64>) -> LinalgResult<Array2<f64>> {
        let n = square_dim(a, "solve")?;
        if b.nrows() != n {
            return Err(LinalgError::DimensionMismatch {
                context: "solve",
                left: a.dim(),
                right: b.dim(),
            });
        }
        ensure_finite(a, "solve")?;
        ensure_finite(b, "solve")?;
        let x = to_dmatrix(a)
            .lu()
            .solve(&to_dmatrix(b))
            .ok_or(LinalgError::Singular { context: "solve" })?;
        finite_or(from_dmatrix(&x), "solve")
    }

    fn expm(&self, a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
        square_dim(a, "expm")?;
        ensure_finite(a, "expm")?;
        finite_or(from_dmatrix(&to_dmatrix(a).exp()), "expm")
    }
}

/// Copy an `ndarray` matrix into a column-major `DMatrix`.
pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Copy a `DMatrix` back into `ndarray` storage.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

fn square_dim(a: &Array2<f64>, context: &'static str) -> LinalgResult<usize> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { context, shape: (rows, cols) });
    }
    Ok(rows)
}

fn ensure_finite(a: &Array2<f64>, context: &'static str) -> LinalgResult<()> {
    if a.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(LinalgError::NonFinite { context })
    }
}

fn finite_or(a: Array2<f64>, context: &'static str) -> LinalgResult<Array2<f64>> {
    ensure_finite(&a, context)?;
    Ok(a)
}
