//! moments::estimator — per-epoch moments, regularization, pooling, whitening.
//!
//! Purpose
//! -------
//! Compute the statistics every SSA solver starts from: the mean `μᵢ`,
//! covariance `Sᵢ` and size `eᵢ` of each epoch, the pooled covariance
//! `Sall`, the pooled mean `μall`, and the whitening matrix `W` of `Sall`.
//!
//! Key behaviors
//! -------------
//! - Epoch covariances use the unbiased `eᵢ − 1` denominator.
//! - If the smallest eigenvalue `λmin` over all epoch covariances is below
//!   [`REGULARIZATION_THRESHOLD`], every `Sᵢ` gets
//!   `(REGULARIZATION_THRESHOLD − λmin)·I` added and a notice is logged.
//! - `Sall = Σ Sᵢ·(eᵢ − 1)/(M − k)` and `μall = Σ μᵢ·eᵢ / M`, with `M` the
//!   total sample count and `k` the number of epochs.
//! - `W = V·Λ^(−1/2)·Vᵀ` from the eigendecomposition of `Sall`.
//!
//! Invariants & assumptions
//! ------------------------
//! - After regularization every `Sᵢ` has smallest eigenvalue at least the
//!   threshold, hence so does `Sall` (a convex combination).
//! - `Sall` is symmetrized before it is decomposed.
//!
//! Downstream usage
//! ----------------
//! - [`EpochStatistics::estimate`] for raw data and an `EpochPartition`.
//! - [`EpochStatistics::from_moments`] for caller-supplied per-epoch
//!   moments, which skips only the per-epoch estimation step.
use crate::{
    linalg::{backend::LinearAlgebra, matrix::symmetrize, rotation::whitening},
    logging::LogSink,
    moments::{
        epochs::EpochPartition,
        errors::{MomentError, MomentResult},
        series::TimeSeries,
    },
};
use ndarray::{Array1, Array2, Axis};

/// Smallest admissible eigenvalue of an epoch covariance.
pub const REGULARIZATION_THRESHOLD: f64 = 1e-7;

/// Per-epoch and pooled moments of a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStatistics {
    covariances: Vec<Array2<f64>>,
    means: Vec<Array1<f64>>,
    sizes: Vec<usize>,
    pooled_covariance: Array2<f64>,
    pooled_mean: Array1<f64>,
    whitening: Array2<f64>,
    regularization: Option<f64>,
}

impl EpochStatistics {
    /// estimate — moments of each epoch of `series` under `partition`.
    ///
    /// Parameters
    /// ----------
    /// - `la`: provider for the eigendecompositions.
    /// - `series`: validated channels × time data.
    /// - `partition`: sample indices per epoch; every epoch must hold at
    ///   least two samples.
    /// - `sink`: receives the regularization notice.
    ///
    /// Errors
    /// ------
    /// - `MomentError::NoEpochs` for an empty partition.
    /// - `MomentError::EpochTooSmall` if an epoch has fewer than 2 samples.
    /// - Anything raised by [`EpochStatistics::from_moments`].
    pub fn estimate<L: LinearAlgebra + ?Sized>(
        la: &L, series: &TimeSeries, partition: &EpochPartition, sink: &dyn LogSink,
    ) -> MomentResult<Self> {
        if partition.is_empty() {
            return Err(MomentError::NoEpochs);
        }
        partition.require_min_size(2)?;

        let x = series.view();
        let mut covariances = Vec::with_capacity(partition.len());
        let mut means = Vec::with_capacity(partition.len());
        for (epoch, group) in partition.groups().iter().enumerate() {
            let samples = x.select(Axis(1), group);
            let mean = samples.mean_axis(Axis(1)).ok_or(MomentError::EpochTooSmall {
                epoch,
                size: 0,
                required: 2,
            })?;
            let centered = &samples - &mean.view().insert_axis(Axis(1));
            let cov = centered.dot(&centered.t()) / (group.len() as f64 - 1.0);
            covariances.push(cov);
            means.push(mean);
        }

        Self::from_moments(la, covariances, means, partition.sizes(), sink)
    }

    /// from_moments — pool and whiten precomputed per-epoch moments.
    ///
    /// Parameters
    /// ----------
    /// - `covariances`: one `n×n` symmetric covariance per epoch.
    /// - `means`: one length-`n` mean per epoch.
    /// - `sizes`: sample count `eᵢ ≥ 1` per epoch.
    ///
    /// Errors
    /// ------
    /// - `MomentError::NoEpochs`, `MomentCountMismatch`, `MomentShapeMismatch`
    ///   for inconsistent inputs.
    /// - `MomentError::EpochTooSmall` for a zero size.
    /// - `MomentError::InsufficientSamples` when `M ≤ k`.
    /// - `MomentError::Linalg` if an eigendecomposition or the whitening
    ///   fails.
    pub fn from_moments<L: LinearAlgebra + ?Sized>(
        la: &L, mut covariances: Vec<Array2<f64>>, means: Vec<Array1<f64>>, sizes: Vec<usize>,
        sink: &dyn LogSink,
    ) -> MomentResult<Self> {
        validate_moments(&covariances, &means, &sizes)?;
        let n = means[0].len();
        let k = sizes.len();
        let total: usize = sizes.iter().sum();
        if total <= k {
            return Err(MomentError::InsufficientSamples { total, epochs: k });
        }

        let regularization = regularize(la, &mut covariances)?;
        if regularization.is_some() {
            sink.info("At least one direction has nearly zero variance; regularizing the epoch covariances.");
        }

        let mut pooled_covariance = Array2::<f64>::zeros((n, n));
        let mut pooled_mean = Array1::<f64>::zeros(n);
        for ((cov, mean), &size) in covariances.iter().zip(&means).zip(&sizes) {
            pooled_covariance.scaled_add(size as f64 - 1.0, cov);
            pooled_mean.scaled_add(size as f64, mean);
        }
        pooled_covariance /= (total - k) as f64;
        pooled_mean /= total as f64;
        let pooled_covariance = symmetrize(&pooled_covariance);

        let whitening = whitening(la, &pooled_covariance)?;

        Ok(Self { covariances, means, sizes, pooled_covariance, pooled_mean, whitening, regularization })
    }

    /// Channel count `n`.
    pub fn dims(&self) -> usize {
        self.pooled_mean.len()
    }

    /// Number of epochs `k`.
    pub fn epochs(&self) -> usize {
        self.sizes.len()
    }

    pub fn covariances(&self) -> &[Array2<f64>] {
        &self.covariances
    }

    pub fn means(&self) -> &[Array1<f64>] {
        &self.means
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Total sample count `M`.
    pub fn total_samples(&self) -> usize {
        self.sizes.iter().sum()
    }

    pub fn pooled_covariance(&self) -> &Array2<f64> {
        &self.pooled_covariance
    }

    pub fn pooled_mean(&self) -> &Array1<f64> {
        &self.pooled_mean
    }

    pub fn whitening(&self) -> &Array2<f64> {
        &self.whitening
    }

    /// Ridge added to every epoch covariance, if regularization was needed.
    pub fn regularization(&self) -> Option<f64> {
        self.regularization
    }
}

fn validate_moments(covariances: &[Array2<f64>], means: &[Array1<f64>], sizes: &[usize]) -> MomentResult<()> {
    if covariances.is_empty() && means.is_empty() && sizes.is_empty() {
        return Err(MomentError::NoEpochs);
    }
    if covariances.len() != means.len() || means.len() != sizes.len() {
        return Err(MomentError::MomentCountMismatch {
            covariances: covariances.len(),
            means: means.len(),
            sizes: sizes.len(),
        });
    }
    let n = means[0].len();
    if n == 0 {
        return Err(MomentError::MomentShapeMismatch { epoch: 0, expected: n, found: (0, 0) });
    }
    for (epoch, (cov, mean)) in covariances.iter().zip(means).enumerate() {
        if cov.dim() != (n, n) {
            return Err(MomentError::MomentShapeMismatch { epoch, expected: n, found: cov.dim() });
        }
        if mean.len() != n {
            return Err(MomentError::MomentShapeMismatch { epoch, expected: n, found: (mean.len(), 1) });
        }
    }
    if let Some(epoch) = sizes.iter().position(|&s| s == 0) {
        return Err(MomentError::EpochTooSmall { epoch, size: 0, required: 1 });
    }
    Ok(())
}

/// Lift every covariance so the global smallest eigenvalue reaches the
/// threshold. Returns the ridge that was added.
fn regularize<L: LinearAlgebra + ?Sized>(la: &L, covariances: &mut [Array2<f64>]) -> MomentResult<Option<f64>> {
    let mut smallest = f64::INFINITY;
    for cov in covariances.iter() {
        let eig = la.symmetric_eigen(&symmetrize(cov))?;
        smallest = smallest.min(eig.eigenvalues[0]);
    }
    if smallest >= REGULARIZATION_THRESHOLD {
        return Ok(None);
    }
    let ridge = REGULARIZATION_THRESHOLD - smallest;
    for cov in covariances.iter_mut() {
        cov.diag_mut().mapv_inplace(|v| v + ridge);
    }
    Ok(Some(ridge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{backend::NalgebraBackend, matrix::max_abs_diff};
    use crate::logging::{MemorySink, NullSink};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Per-epoch mean/covariance estimation on hand-checkable data.
    // - Pooling weights and the whitening identity.
    // - Regularization of singular epoch covariances and its log line.
    // - Validation of precomputed moments.
    //
    // They intentionally DO NOT cover:
    // - Epoch partitioning rules (see `moments::epochs`).
    // -------------------------------------------------------------------------

    fn series(rows: Vec<Vec<f64>>) -> TimeSeries {
        let n = rows.len();
        let t = rows[0].len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        TimeSeries::new(Array2::from_shape_vec((n, t), flat).unwrap()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Means and unbiased covariances are computed per epoch.
    //
    // Given
    // -----
    // - A 2-channel series of 6 samples, split into 2 epochs of 3.
    //
    // Expect
    // ------
    // - Epoch 0: mean [2, 1], covariance [[1, 0.5], [0.5, 1]] (hand computed).
    // - Pooled mean is the size-weighted mean of the epoch means.
    fn estimate_computes_epoch_moments() {
        // Arrange
        let s = series(vec![vec![1.0, 2.0, 3.0, 10.0, 12.0, 14.0], vec![0.0, 2.0, 1.0, 5.0, 5.0, 8.0]]);
        let partition = EpochPartition::equal(6, 2).unwrap();

        // Act
        let stats = EpochStatistics::estimate(&NalgebraBackend, &s, &partition, &NullSink).unwrap();

        // Assert
        assert_eq!(stats.epochs(), 2);
        assert_eq!(stats.sizes(), &[3, 3]);
        assert_relative_eq!(stats.means()[0][0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.means()[0][1], 1.0, epsilon = 1e-12);
        let c0 = &stats.covariances()[0];
        assert_relative_eq!(c0[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(c0[[0, 1]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(c0[[1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(stats.pooled_mean()[0], 7.0, epsilon = 1e-12);
        assert_relative_eq!(stats.pooled_mean()[1], 3.5, epsilon = 1e-12);
        assert!(stats.regularization().is_none());
    }

    #[test]
    // Purpose
    // -------
    // The whitening matrix maps the pooled covariance to the identity.
    //
    // Given
    // -----
    // - Two epochs with distinct SPD covariances.
    //
    // Expect
    // ------
    // - `W·Sall·Wᵀ = I` and `Sall` is the (e − 1)-weighted average.
    fn whitening_normalizes_pooled_covariance() {
        // Arrange
        let covs = vec![array![[2.0, 0.3], [0.3, 1.0]], array![[1.0, -0.2], [-0.2, 3.0]]];
        let means = vec![array![0.0, 0.0], array![1.0, 1.0]];
        let sizes = vec![11, 31];

        // Act
        let stats = EpochStatistics::from_moments(&NalgebraBackend, covs, means, sizes, &NullSink).unwrap();

        // Assert
        let expected = (array![[2.0, 0.3], [0.3, 1.0]] * 10.0 + array![[1.0, -0.2], [-0.2, 3.0]] * 30.0) / 40.0;
        assert!(max_abs_diff(stats.pooled_covariance(), &expected) < 1e-12);
        let w = stats.whitening();
        let white = w.dot(stats.pooled_covariance()).dot(&w.t());
        assert!(max_abs_diff(&white, &Array2::eye(2)) < 1e-10);
        assert_relative_eq!(stats.pooled_mean()[0], 31.0 / 42.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Identity epoch covariances need no whitening.
    //
    // Given
    // -----
    // - Three epochs with `Sᵢ = I`.
    //
    // Expect
    // ------
    // - `W = I`.
    fn identity_covariances_give_identity_whitening() {
        let covs = vec![Array2::eye(3); 3];
        let means = vec![Array1::zeros(3); 3];

        let stats =
            EpochStatistics::from_moments(&NalgebraBackend, covs, means, vec![20, 20, 20], &NullSink)
                .unwrap();

        assert!(max_abs_diff(stats.whitening(), &Array2::eye(3)) < 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // A zero-variance direction triggers regularization.
    //
    // Given
    // -----
    // - One epoch covariance diag(1, 0), another diag(2, 1).
    //
    // Expect
    // ------
    // - A ridge of the threshold is recorded and logged.
    // - The pooled covariance's smallest eigenvalue is at least the
    //   threshold.
    fn singular_epoch_covariance_is_regularized() {
        // Arrange
        let sink = MemorySink::new();
        let covs = vec![array![[1.0, 0.0], [0.0, 0.0]], array![[2.0, 0.0], [0.0, 1.0]]];
        let means = vec![array![0.0, 0.0], array![0.0, 0.0]];

        // Act
        let stats =
            EpochStatistics::from_moments(&NalgebraBackend, covs, means, vec![10, 10], &sink).unwrap();

        // Assert
        let ridge = stats.regularization().expect("regularization must be applied");
        assert_relative_eq!(ridge, REGULARIZATION_THRESHOLD, epsilon = 1e-15);
        assert!(sink.contains("regularizing"));
        let eig = NalgebraBackend.symmetric_eigen(stats.pooled_covariance()).unwrap();
        assert!(eig.eigenvalues[0] >= REGULARIZATION_THRESHOLD - 1e-15);
        assert!(stats.covariances()[0][[1, 1]] >= REGULARIZATION_THRESHOLD - 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Inconsistent precomputed moments are rejected before any algebra.
    //
    // Given
    // -----
    // - Two covariances but one mean; then a 3x3 covariance among 2-vectors.
    //
    // Expect
    // ------
    // - `MomentCountMismatch`, then `MomentShapeMismatch { epoch: 1, .. }`.
    fn inconsistent_moments_are_rejected() {
        let two = vec![Array2::eye(2), Array2::eye(2)];
        let err = EpochStatistics::from_moments(&NalgebraBackend, two, vec![Array1::zeros(2)], vec![5, 5], &NullSink)
            .expect_err("count mismatch");
        assert!(matches!(err, MomentError::MomentCountMismatch { covariances: 2, means: 1, sizes: 2 }));

        let mixed = vec![Array2::eye(2), Array2::eye(3)];
        let err = EpochStatistics::from_moments(
            &NalgebraBackend,
            mixed,
            vec![Array1::zeros(2), Array1::zeros(2)],
            vec![5, 5],
            &NullSink,
        )
        .expect_err("shape mismatch");
        assert!(matches!(err, MomentError::MomentShapeMismatch { epoch: 1, expected: 2, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Single-sample epochs cannot carry a covariance.
    //
    // Given
    // -----
    // - Labels giving one epoch of size 1.
    //
    // Expect
    // ------
    // - `EpochTooSmall { required: 2, .. }`.
    fn single_sample_epoch_is_rejected() {
        let s = series(vec![vec![1.0, 2.0, 3.0], vec![0.0, 1.0, 0.5]]);
        let partition = EpochPartition::from_labels(&[0, 0, 1], 3).unwrap();

        let err = EpochStatistics::estimate(&NalgebraBackend, &s, &partition, &NullSink)
            .expect_err("epoch of one sample");

        assert_eq!(err, MomentError::EpochTooSmall { epoch: 1, size: 1, required: 2 });
    }
}
