//! moments::errors — validation and numerical failures of the moment estimator.
//!
//! Purpose
//! -------
//! Report malformed time series, inadmissible epoch definitions and
//! inconsistent precomputed moments as typed errors, and carry
//! linear-algebra failures raised while regularizing or whitening.
//!
//! Conventions
//! -----------
//! - Epoch indices in payloads are 0-based positions in the partition, not
//!   user labels.
//! - Every variant is a configuration or data error; none is retried.
use crate::linalg::errors::LinalgError;
use std::fmt;

/// Result alias for moment estimation.
pub type MomentResult<T> = Result<T, MomentError>;

#[derive(Debug, Clone, PartialEq)]
pub enum MomentError {
    // ---- Time series ----
    /// The series has no channels or no samples.
    EmptySeries { dims: usize, samples: usize },

    /// A sample is NaN or infinite.
    NonFiniteData { row: usize, col: usize, value: f64 },

    // ---- Epochs ----
    /// Requested equal-size epoch count is inadmissible.
    InvalidEpochCount { count: usize, samples: usize, reason: &'static str },

    /// Custom epoch labels do not cover the series.
    LabelLengthMismatch { expected: usize, found: usize },

    /// An epoch holds fewer samples than its moments require.
    EpochTooSmall { epoch: usize, size: usize, required: usize },

    // ---- Precomputed moments ----
    /// No epochs were supplied.
    NoEpochs,

    /// Covariance, mean and size lists disagree in length.
    MomentCountMismatch { covariances: usize, means: usize, sizes: usize },

    /// A covariance or mean has the wrong shape for the dimension.
    MomentShapeMismatch { epoch: usize, expected: usize, found: (usize, usize) },

    /// Pooling needs more samples than epochs.
    InsufficientSamples { total: usize, epochs: usize },

    // ---- Numerical ----
    /// Decomposition failure during regularization or whitening.
    Linalg(LinalgError),
}

impl std::error::Error for MomentError {}

impl fmt::Display for MomentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // ---- Time series ----
            MomentError::EmptySeries { dims, samples } => {
                write!(f, "Time series must be non-empty, found {dims} channels x {samples} samples")
            }
            MomentError::NonFiniteData { row, col, value } => {
                write!(f, "Non-finite sample {value} at channel {row}, time {col}")
            }

            // ---- Epochs ----
            MomentError::InvalidEpochCount { count, samples, reason } => {
                write!(f, "Invalid number of epochs {count} for {samples} samples: {reason}")
            }
            MomentError::LabelLengthMismatch { expected, found } => {
                write!(f, "Epoch label count mismatch: expected {expected}, found {found}")
            }
            MomentError::EpochTooSmall { epoch, size, required } => {
                write!(
                    f,
                    "Epoch {epoch} holds {size} samples, at least {required} are required"
                )
            }

            // ---- Precomputed moments ----
            MomentError::NoEpochs => write!(f, "At least one epoch is required"),
            MomentError::MomentCountMismatch { covariances, means, sizes } => {
                write!(
                    f,
                    "Moment lists disagree: {covariances} covariances, {means} means, {sizes} sizes"
                )
            }
            MomentError::MomentShapeMismatch { epoch, expected, found } => {
                write!(
                    f,
                    "Moment of epoch {epoch} has shape {}x{}, expected dimension {expected}",
                    found.0, found.1
                )
            }
            MomentError::InsufficientSamples { total, epochs } => {
                write!(f, "Pooling needs more samples ({total}) than epochs ({epochs})")
            }

            // ---- Numerical ----
            MomentError::Linalg(err) => write!(f, "Linear algebra failure: {err}"),
        }
    }
}

impl From<LinalgError> for MomentError {
    fn from(err: LinalgError) -> Self {
        MomentError::Linalg(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Linear-algebra failures are wrapped, not flattened.
    //
    // Given
    // -----
    // - A `LinalgError::NotPositiveDefinite`.
    //
    // Expect
    // ------
    // - `MomentError::Linalg` holding the same error, with its text embedded.
    fn linalg_errors_are_wrapped() {
        let inner = LinalgError::NotPositiveDefinite { context: "whitening" };

        let err: MomentError = inner.clone().into();

        assert_eq!(err, MomentError::Linalg(inner));
        assert!(err.to_string().contains("whitening"));
    }
}
