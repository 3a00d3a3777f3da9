//! ssa::params — validated SSA run parameters.
//!
//! Purpose
//! -------
//! Hold the user-facing knobs of an SSA run and reject inadmissible values
//! at construction, so a [`SsaParameters`] value is always usable.
//!
//! Key behaviors
//! -------------
//! - `d ≥ 1`, `restarts ≥ 1` and at least one moment are enforced by the
//!   builder methods; `d < n` is checked against the data by
//!   [`SsaParameters::check_dims`].
//! - [`SsaParameters::check_determinacy`] compares the epoch count with the
//!   smallest count that identifies the stationary subspace:
//!   `(n − d)/2 + 3` with both moments, `n − d + 2` with one (integer
//!   division).
//!
//! Conventions
//! -----------
//! - Defaults: 5 restarts, both moments, determinacy enforced, stationary
//!   primary target.
use crate::{
    optimization::types::MomentSet,
    ssa::errors::{SsaError, SsaResult},
};

/// Default number of random restarts per phase.
pub const DEFAULT_RESTARTS: usize = 5;

/// Which subspace drives the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimaryTarget {
    /// Dual-phase SSA: stationary block first, then the non-stationary
    /// block seeded from it.
    #[default]
    Stationary,
    /// Single-phase search for the most non-stationary block only.
    NonStationary,
}

/// Parameters of an SSA run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsaParameters {
    stationary_sources: usize,
    restarts: usize,
    moments: MomentSet,
    ignore_determinacy: bool,
    target: PrimaryTarget,
}

impl SsaParameters {
    /// Parameters for `stationary_sources` stationary sources with defaults.
    ///
    /// # Errors
    /// [`SsaError::InvalidStationarySources`] when `stationary_sources == 0`.
    pub fn new(stationary_sources: usize) -> SsaResult<Self> {
        if stationary_sources == 0 {
            return Err(SsaError::InvalidStationarySources { sources: 0, dims: None });
        }
        Ok(Self {
            stationary_sources,
            restarts: DEFAULT_RESTARTS,
            moments: MomentSet::Both,
            ignore_determinacy: false,
            target: PrimaryTarget::Stationary,
        })
    }

    /// # Errors
    /// [`SsaError::InvalidRestarts`] when `restarts == 0`.
    pub fn with_restarts(mut self, restarts: usize) -> SsaResult<Self> {
        if restarts == 0 {
            return Err(SsaError::InvalidRestarts { restarts });
        }
        self.restarts = restarts;
        Ok(self)
    }

    /// # Errors
    /// [`SsaError::NoMomentSelected`] when both flags are `false`.
    pub fn with_moments(mut self, use_mean: bool, use_covariance: bool) -> SsaResult<Self> {
        self.moments = MomentSet::from_flags(use_mean, use_covariance).ok_or(SsaError::NoMomentSelected)?;
        Ok(self)
    }

    /// Downgrade determinacy violations to a logged warning.
    pub fn with_ignore_determinacy(mut self, ignore: bool) -> Self {
        self.ignore_determinacy = ignore;
        self
    }

    pub fn with_target(mut self, target: PrimaryTarget) -> Self {
        self.target = target;
        self
    }

    pub fn stationary_sources(&self) -> usize {
        self.stationary_sources
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn moments(&self) -> MomentSet {
        self.moments
    }

    pub fn uses_mean(&self) -> bool {
        self.moments.uses_mean()
    }

    pub fn uses_covariance(&self) -> bool {
        self.moments.uses_covariance()
    }

    pub fn ignores_determinacy(&self) -> bool {
        self.ignore_determinacy
    }

    pub fn target(&self) -> PrimaryTarget {
        self.target
    }

    /// # Errors
    /// [`SsaError::InvalidStationarySources`] unless `d < dims`.
    pub fn check_dims(&self, dims: usize) -> SsaResult<()> {
        if self.stationary_sources >= dims {
            return Err(SsaError::InvalidStationarySources {
                sources: self.stationary_sources,
                dims: Some(dims),
            });
        }
        Ok(())
    }

    /// Smallest epoch count that determines the solution for `dims` channels.
    pub fn required_epochs(&self, dims: usize) -> usize {
        let free = dims.saturating_sub(self.stationary_sources);
        match self.moments {
            MomentSet::Both => free / 2 + 3,
            MomentSet::MeanOnly | MomentSet::CovarianceOnly => free + 2,
        }
    }

    /// check_determinacy — compare `epochs` against [`Self::required_epochs`].
    ///
    /// Returns
    /// -------
    /// - `Ok(None)` when the epoch count suffices.
    /// - `Ok(Some(required))` when it does not but determinacy is ignored.
    ///
    /// Errors
    /// ------
    /// - `SsaError::DeterminacyViolated` otherwise.
    pub fn check_determinacy(&self, dims: usize, epochs: usize) -> SsaResult<Option<usize>> {
        let required = self.required_epochs(dims);
        if epochs >= required {
            Ok(None)
        } else if self.ignore_determinacy {
            Ok(Some(required))
        } else {
            Err(SsaError::DeterminacyViolated { epochs, required })
        }
    }
}
