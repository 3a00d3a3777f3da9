//! optimization::types — shared configuration and outcome types.
//!
//! Conventions
//! -----------
//! - Demixing matrices hold one source per row; mixing matrices one source
//!   per column.
//! - `Subspace::NonStationary` runs optimize the leading `n − d` rows and
//!   report them back as `Pn`, so outcomes always read the same way.
use ndarray::Array2;

/// Which moments enter the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentSet {
    MeanOnly,
    CovarianceOnly,
    Both,
}

impl MomentSet {
    /// Map the two user-facing flags; `None` when neither is set.
    pub fn from_flags(use_mean: bool, use_covariance: bool) -> Option<Self> {
        match (use_mean, use_covariance) {
            (true, true) => Some(MomentSet::Both),
            (true, false) => Some(MomentSet::MeanOnly),
            (false, true) => Some(MomentSet::CovarianceOnly),
            (false, false) => None,
        }
    }

    pub fn uses_mean(self) -> bool {
        matches!(self, MomentSet::MeanOnly | MomentSet::Both)
    }

    pub fn uses_covariance(self) -> bool {
        matches!(self, MomentSet::CovarianceOnly | MomentSet::Both)
    }
}

/// Which block of rows a manifold run optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subspace {
    Stationary,
    NonStationary,
}

/// Parameters of a single manifold optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// `d`, the number of stationary sources.
    pub stationary_sources: usize,
    pub subspace: Subspace,
    pub moments: MomentSet,
}

impl RunConfig {
    /// Rows optimized by the run: `d` for stationary, `n − d` otherwise.
    pub fn optimized_rows(&self, dims: usize) -> usize {
        match self.subspace {
            Subspace::Stationary => self.stationary_sources,
            Subspace::NonStationary => dims.saturating_sub(self.stationary_sources),
        }
    }
}

/// Result of one manifold optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// `d×n` stationary projection.
    pub ps: Array2<f64>,
    /// `(n−d)×n` non-stationary projection.
    pub pn: Array2<f64>,
    /// `n×d` stationary mixing columns.
    pub bs: Array2<f64>,
    /// `n×(n−d)` non-stationary mixing columns.
    pub bn: Array2<f64>,
    /// Normalized loss as minimized (negated for non-stationary runs).
    pub loss: f64,
    /// Unnormalized objective of the optimized block.
    pub raw_loss: f64,
    /// Degrees of freedom used for normalization.
    pub dof: usize,
    pub iterations: usize,
    pub converged: bool,
}
