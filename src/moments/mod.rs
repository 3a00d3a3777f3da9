//! moments — epoching and moment estimation for SSA.
//!
//! Purpose
//! -------
//! Turn a raw multivariate time series into the per-epoch means and
//! covariances, pooled statistics and whitening transform that every SSA
//! solver consumes.
//!
//! Key behaviors
//! -------------
//! - `series`: validated channels × time container ([`series::TimeSeries`]).
//! - `epochs`: equal-size, heuristic and label-based partitions.
//! - `estimator`: [`estimator::EpochStatistics`] with regularization,
//!   pooling and whitening, from data or from precomputed moments.
//! - `errors`: [`errors::MomentError`] and `MomentResult<T>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Samples are finite; epochs hold at least two samples.
//! - The pooled covariance is symmetric positive definite once estimation
//!   succeeds, so its whitening matrix always exists.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its own rules on hand-computed inputs; the
//!   integration tests run the estimator inside full SSA fits.

pub mod epochs;
pub mod errors;
pub mod estimator;
pub mod series;

pub mod prelude {
    pub use super::epochs::{heuristic_epoch_count, EpochPartition, EpochScheme};
    pub use super::errors::{MomentError, MomentResult};
    pub use super::estimator::{EpochStatistics, REGULARIZATION_THRESHOLD};
    pub use super::series::TimeSeries;
}
