//! linalg::errors — failures raised by the linear-algebra provider.
//!
//! Purpose
//! -------
//! Give every decomposition and matrix helper a single, typed failure
//! surface so that moment estimation and optimization can propagate
//! numerical problems with `?` instead of panicking.
//!
//! Conventions
//! -----------
//! - Shapes are reported as `(rows, cols)`.
//! - `context` strings name the operation that failed (`"cholesky"`,
//!   `"solve"`, ...), never a caller.
use std::fmt;

/// Result alias for linear-algebra operations.
pub type LinalgResult<T> = Result<T, LinalgError>;

#[derive(Debug, Clone, PartialEq)]
pub enum LinalgError {
    // ---- Shape ----
    /// Operation requires a square matrix.
    NotSquare { context: &'static str, shape: (usize, usize) },

    /// Operand shapes are incompatible.
    DimensionMismatch { context: &'static str, left: (usize, usize), right: (usize, usize) },

    // ---- Numerical ----
    /// Cholesky factorization or whitening found a non-positive-definite matrix.
    NotPositiveDefinite { context: &'static str },

    /// Linear system has no unique solution.
    Singular { context: &'static str },

    /// Input or output contains NaN or ±∞.
    NonFinite { context: &'static str },
}

impl std::error::Error for LinalgError {}

impl fmt::Display for LinalgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinalgError::NotSquare { context, shape } => {
                write!(f, "{context}: expected a square matrix, found {}x{}", shape.0, shape.1)
            }
            LinalgError::DimensionMismatch { context, left, right } => {
                write!(
                    f,
                    "{context}: incompatible shapes {}x{} and {}x{}",
                    left.0, left.1, right.0, right.1
                )
            }
            LinalgError::NotPositiveDefinite { context } => {
                write!(f, "{context}: matrix is not positive definite")
            }
            LinalgError::Singular { context } => {
                write!(f, "{context}: matrix is singular")
            }
            LinalgError::NonFinite { context } => {
                write!(f, "{context}: encountered a non-finite value")
            }
        }
    }
}
