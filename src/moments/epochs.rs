//! moments::epochs — partitioning a time series into epochs.
//!
//! Purpose
//! -------
//! Turn an [`EpochScheme`] into an [`EpochPartition`]: the list of sample
//! indices belonging to each epoch, in the order the estimator visits them.
//!
//! Key behaviors
//! -------------
//! - `Equal(N)`: `N` contiguous epochs of `⌊T/N⌋` samples each; the trailing
//!   `T mod N` samples are dropped.
//! - `Heuristic`: resolves to `Equal(N)` with `N` from
//!   [`heuristic_epoch_count`] (geometric mean of the smallest determined
//!   count and `T/(2n)`).
//! - `Custom(labels)`: one label per sample; epochs are label groups in
//!   ascending label order, sample order preserved inside a group.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every epoch holds at least two samples (covariances use the `e − 1`
//!   denominator); when covariances are requested, at least `n`.
//! - A partition never contains an empty epoch.
//!
//! Downstream usage
//! ----------------
//! - `EpochStatistics::estimate` consumes a partition; the orchestrator
//!   builds it and runs the determinacy check on `len()`.
use crate::moments::errors::{MomentError, MomentResult};
use std::collections::BTreeMap;

/// How samples are grouped into epochs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpochScheme {
    /// `N` contiguous epochs of equal size.
    Equal(usize),
    /// Equal-size epochs with a data-driven count.
    Heuristic,
    /// One label per sample.
    Custom(Vec<i64>),
}

/// Sample indices per epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochPartition {
    groups: Vec<Vec<usize>>,
}

impl EpochPartition {
    /// Contiguous equal-size epochs.
    ///
    /// # Errors
    /// [`MomentError::InvalidEpochCount`] when `count` is zero or exceeds
    /// `samples`.
    pub fn equal(samples: usize, count: usize) -> MomentResult<Self> {
        if count == 0 {
            return Err(MomentError::InvalidEpochCount {
                count,
                samples,
                reason: "number of epochs must be positive",
            });
        }
        if count > samples {
            return Err(MomentError::InvalidEpochCount {
                count,
                samples,
                reason: "number of epochs cannot exceed the number of samples",
            });
        }
        let size = samples / count;
        let groups = (0..count).map(|i| (i * size..(i + 1) * size).collect()).collect();
        Ok(Self { groups })
    }

    /// Epochs from per-sample labels, ordered by ascending label.
    ///
    /// # Errors
    /// [`MomentError::LabelLengthMismatch`] if `labels.len() != samples`.
    pub fn from_labels(labels: &[i64], samples: usize) -> MomentResult<Self> {
        if labels.len() != samples {
            return Err(MomentError::LabelLengthMismatch { expected: samples, found: labels.len() });
        }
        let mut by_label: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (t, &label) in labels.iter().enumerate() {
            by_label.entry(label).or_default().push(t);
        }
        Ok(Self { groups: by_label.into_values().collect() })
    }

    /// Enforce the per-epoch minimum sample count.
    ///
    /// # Errors
    /// [`MomentError::EpochTooSmall`] naming the first offending epoch.
    pub fn require_min_size(&self, required: usize) -> MomentResult<()> {
        match self.groups.iter().position(|g| g.len() < required) {
            Some(epoch) => Err(MomentError::EpochTooSmall {
                epoch,
                size: self.groups[epoch].len(),
                required,
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.groups.iter().map(Vec::len).collect()
    }

    /// Number of samples covered by the partition.
    pub fn covered(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// heuristic_epoch_count — default number of equal-size epochs.
///
/// Parameters
/// ----------
/// - `dims`: channel count `n`.
/// - `samples`: series length `T`.
/// - `stationary`: requested stationary source count `d`.
/// - `both_moments`: whether means and covariances are both used.
///
/// Returns
/// -------
/// `round(sqrt(minEpochs · maxEpochs))`, at least 1, where
/// `minEpochs = (n − d)/2 + 3` with both moments and `n − d + 2` with one,
/// and `maxEpochs = T / (2n)`. Both bounds are real-valued.
pub fn heuristic_epoch_count(dims: usize, samples: usize, stationary: usize, both_moments: bool) -> usize {
    let (min_epochs, max_epochs) = heuristic_bounds(dims, samples, stationary, both_moments);
    let count = (min_epochs * max_epochs).sqrt().round();
    if count.is_finite() && count >= 1.0 { count as usize } else { 1 }
}

/// The `(minEpochs, maxEpochs)` pair behind [`heuristic_epoch_count`].
pub fn heuristic_bounds(dims: usize, samples: usize, stationary: usize, both_moments: bool) -> (f64, f64) {
    let free = dims as f64 - stationary as f64;
    let min_epochs = if both_moments { free / 2.0 + 3.0 } else { free + 2.0 };
    let max_epochs = samples as f64 / (2.0 * dims as f64);
    (min_epochs, max_epochs)
}
