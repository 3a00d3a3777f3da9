//! optimization::errors — failures of the objective and the manifold optimizer.
//!
//! Purpose
//! -------
//! Give the objective evaluator, line search and conjugate-gradient driver a
//! single error enum. Numerical failures of the linear-algebra provider are
//! wrapped rather than flattened so callers can still match on them.
use crate::linalg::errors::LinalgError;
use std::fmt;

/// Result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Configuration ----
    /// Optimized block must satisfy `1 ≤ dim ≤ dims`.
    InvalidSubspaceDim { dim: usize, dims: usize },

    /// Stationary source count must satisfy `1 ≤ d < n`.
    InvalidStationarySources { sources: usize, dims: usize },

    /// Initial rotation has the wrong shape.
    InvalidInitialRotation { expected: usize, found: (usize, usize) },

    /// Rotated moments do not match the epoch sizes.
    EpochCountMismatch { moments: usize, sizes: usize },

    /// Generator passed to the objective has the wrong shape.
    GeneratorShapeMismatch { expected: usize, found: (usize, usize) },

    // ---- Objective ----
    /// Objective value is NaN or infinite.
    NonFiniteLoss { value: f64 },

    /// A gradient entry is NaN or infinite.
    InvalidGradient { row: usize, col: usize, value: f64 },

    /// Gradient shape does not match the rotation shape.
    GradientShapeMismatch { expected: usize, found: (usize, usize) },

    /// Gradient was requested from an evaluation that skipped it.
    MissingGradient,

    // ---- Diagnostics ----
    /// χ² reference distribution could not be built.
    InvalidDegreesOfFreedom { dof: usize },

    // ---- Numerical ----
    Linalg(LinalgError),
}

impl std::error::Error for OptError {}

impl fmt::Display for OptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // ---- Configuration ----
            OptError::InvalidSubspaceDim { dim, dims } => {
                write!(f, "Invalid subspace dimension {dim}: must satisfy 1 <= dim <= {dims}")
            }
            OptError::InvalidStationarySources { sources, dims } => {
                write!(f, "Invalid number of stationary sources {sources}: must satisfy 1 <= d < {dims}")
            }
            OptError::InvalidInitialRotation { expected, found } => {
                write!(
                    f,
                    "Initial rotation must be {expected}x{expected}, found {}x{}",
                    found.0, found.1
                )
            }
            OptError::EpochCountMismatch { moments, sizes } => {
                write!(f, "Moments for {moments} epochs but {sizes} epoch sizes")
            }
            OptError::GeneratorShapeMismatch { expected, found } => {
                write!(f, "Generator must be {expected}x{expected}, found {}x{}", found.0, found.1)
            }

            // ---- Objective ----
            OptError::NonFiniteLoss { value } => {
                write!(f, "Non-finite objective value: {value}")
            }
            OptError::InvalidGradient { row, col, value } => {
                write!(f, "Invalid gradient at ({row}, {col}): {value}, must be finite")
            }
            OptError::GradientShapeMismatch { expected, found } => {
                write!(f, "Gradient must be {expected}x{expected}, found {}x{}", found.0, found.1)
            }
            OptError::MissingGradient => write!(f, "Gradient was not computed for this evaluation"),

            // ---- Diagnostics ----
            OptError::InvalidDegreesOfFreedom { dof } => {
                write!(f, "Invalid degrees of freedom {dof} for the chi-square reference")
            }

            // ---- Numerical ----
            OptError::Linalg(err) => write!(f, "Linear algebra failure: {err}"),
        }
    }
}

impl From<LinalgError> for OptError {
    fn from(err: LinalgError) -> Self {
        OptError::Linalg(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Payload embedding in `Display` output.
    // - The `LinalgError` conversion.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Gradient errors report their position and value.
    //
    // Given
    // -----
    // - `InvalidGradient { row: 1, col: 2, value: NaN }`.
    //
    // Expect
    // ------
    // - The message contains "(1, 2)" and "NaN".
    fn invalid_gradient_display_includes_position() {
        let err = OptError::InvalidGradient { row: 1, col: 2, value: f64::NAN };

        let msg = err.to_string();

        assert!(msg.contains("(1, 2)"));
        assert!(msg.contains("NaN"));
    }

    #[test]
    // Purpose
    // -------
    // Provider failures keep their identity.
    //
    // Given
    // -----
    // - `LinalgError::Singular { context: "solve" }`.
    //
    // Expect
    // ------
    // - `OptError::Linalg` wrapping the same value.
    fn linalg_error_converts_to_wrapped_variant() {
        let inner = LinalgError::Singular { context: "solve" };

        let err: OptError = inner.clone().into();

        assert_eq!(err, OptError::Linalg(inner));
    }
}
