//! linalg — linear-algebra provider and dense helpers.
//!
//! Purpose
//! -------
//! Collect the numerical substrate of the SSA pipeline: the injected
//! [`backend::LinearAlgebra`] provider, plain `ndarray` helpers for skew
//! matrices and stacking, and the rotation/whitening constructors.
//!
//! Key behaviors
//! -------------
//! - `backend`: trait + `NalgebraBackend` default (Cholesky, ascending
//!   symmetric eigendecomposition, LU solve, matrix exponential).
//! - `matrix`: Frobenius and skew inner products, `skew`, `symmetrize`,
//!   `stack_rows`.
//! - `rotation`: random rotations `exp(M − Mᵀ)` and whitening matrices.
//! - `errors`: [`errors::LinalgError`] and the `LinalgResult<T>` alias.
//!
//! Conventions
//! -----------
//! - Matrices are `ndarray::Array2<f64>` in row-major logical layout.
//! - Nothing in this module logs; callers decide what to report.

pub mod backend;
pub mod errors;
pub mod matrix;
pub mod rotation;

pub mod prelude {
    pub use super::backend::{LinearAlgebra, NalgebraBackend, SymmetricEigen};
    pub use super::errors::{LinalgError, LinalgResult};
}
