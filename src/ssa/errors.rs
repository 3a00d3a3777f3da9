//! ssa::errors — configuration and run failures of the SSA orchestrator.
//!
//! Purpose
//! -------
//! Be the single error type returned by the public SSA entry points.
//! Parameter and determinacy problems get dedicated variants; failures from
//! the moment estimator, optimizer and linear-algebra provider are wrapped
//! so callers can still match on the underlying cause.
//!
//! Conventions
//! -----------
//! - Every configuration error is raised before any optimization work
//!   starts.
//! - With `python-bindings`, every variant maps to `ValueError`.
use crate::{linalg::errors::LinalgError, moments::errors::MomentError, optimization::errors::OptError};
use std::fmt;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, PyErr};

/// Result alias for SSA runs.
pub type SsaResult<T> = Result<T, SsaError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SsaError {
    // ---- Parameters ----
    /// Stationary source count must satisfy `1 ≤ d < n`.
    InvalidStationarySources { sources: usize, dims: Option<usize> },

    /// At least one restart is required.
    InvalidRestarts { restarts: usize },

    /// Neither the mean nor the covariance is used.
    NoMomentSelected,

    // ---- Determinacy ----
    /// Too few epochs to identify the stationary subspace.
    DeterminacyViolated { epochs: usize, required: usize },

    // ---- Wrapped ----
    Moment(MomentError),
    Optimization(OptError),
    Linalg(LinalgError),
}

impl std::error::Error for SsaError {}

impl fmt::Display for SsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // ---- Parameters ----
            SsaError::InvalidStationarySources { sources, dims: Some(dims) } => {
                write!(
                    f,
                    "Invalid number of stationary sources {sources}: must satisfy 1 <= d < {dims}"
                )
            }
            SsaError::InvalidStationarySources { sources, dims: None } => {
                write!(f, "Invalid number of stationary sources {sources}: must be positive")
            }
            SsaError::InvalidRestarts { restarts } => {
                write!(f, "Invalid number of restarts {restarts}: must be positive")
            }
            SsaError::NoMomentSelected => {
                write!(f, "At least one of 'use mean' or 'use covariance' must be selected")
            }

            // ---- Determinacy ----
            SsaError::DeterminacyViolated { epochs, required } => {
                write!(
                    f,
                    "Too few epochs ({epochs}); spurious stationary directions are possible. \
                     At least {required} distinct epochs are needed for a determined solution"
                )
            }

            // ---- Wrapped ----
            SsaError::Moment(err) => write!(f, "{err}"),
            SsaError::Optimization(err) => write!(f, "{err}"),
            SsaError::Linalg(err) => write!(f, "{err}"),
        }
    }
}

impl From<MomentError> for SsaError {
    fn from(err: MomentError) -> Self {
        SsaError::Moment(err)
    }
}

impl From<OptError> for SsaError {
    fn from(err: OptError) -> Self {
        SsaError::Optimization(err)
    }
}

impl From<LinalgError> for SsaError {
    fn from(err: LinalgError) -> Self {
        SsaError::Linalg(err)
    }
}

/// Convert an [`SsaError`] into a Python `ValueError` carrying its message.
#[cfg(feature = "python-bindings")]
impl From<SsaError> for PyErr {
    fn from(err: SsaError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
