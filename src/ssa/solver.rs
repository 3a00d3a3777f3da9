//! ssa::solver — the SSA orchestrator.
//!
//! Purpose
//! -------
//! Turn a time series (or precomputed epoch moments) and a set of
//! [`SsaParameters`] into a [`Decomposition`]: resolve the epoching, check
//! that the problem is determined, estimate the moments, then dispatch to
//! the iterative or closed-form solver.
//!
//! Key behaviors
//! -------------
//! - Iterative mode runs `r` random restarts of the stationary search and
//!   keeps the lowest loss, then `r` restarts of the non-stationary search
//!   (the first seeded with `[Pn; Ps]` of phase 1) and keeps the lowest
//!   negated loss. `Ps` of phase 1 and `Pn` of phase 2 are stacked and
//!   inverted once to obtain consistent bases.
//! - Mean-only fits use [`solve_mean_only`]; [`PrimaryTarget::NonStationary`]
//!   with covariances runs a single non-stationary phase.
//! - The stop flag is reset when a fit starts and polled after each restart.
//!   A stop during phase 1 returns phase 1's best run alone.
//! - Progress lines (epoching, warnings, one line per restart) go to the
//!   configured [`LogSink`].
//!
//! Invariants & assumptions
//! ------------------------
//! - All configuration errors, including determinacy, are raised before
//!   the moments are estimated.
//! - Randomness comes only from the solver's own `ChaCha8Rng`; equal seeds
//!   give equal results.
//!
//! Downstream usage
//! ----------------
//! - The Python `SSA` class wraps one `Ssa<NalgebraBackend>`.
use crate::{
    linalg::{
        backend::{LinearAlgebra, NalgebraBackend},
        matrix::stack_rows,
    },
    logging::{LogSink, TracingSink},
    moments::{
        epochs::{heuristic_bounds, heuristic_epoch_count, EpochPartition, EpochScheme},
        estimator::EpochStatistics,
        series::TimeSeries,
    },
    optimization::{
        manifold,
        types::{MomentSet, RunConfig, RunOutcome, Subspace},
    },
    ssa::{
        cancel::CancellationToken,
        closed_form::solve_mean_only,
        errors::{SsaError, SsaResult},
        params::{PrimaryTarget, SsaParameters},
        results::{Decomposition, EpochSummary, PhaseSummary, SolveMethod},
    },
};
use ndarray::{s, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Best restart of one phase.
struct PhaseRun {
    best: RunOutcome,
    cancelled: bool,
}

/// Stationary Subspace Analysis solver.
pub struct Ssa<L: LinearAlgebra = NalgebraBackend> {
    la: L,
    rng: ChaCha8Rng,
    sink: Arc<dyn LogSink>,
    stop: CancellationToken,
}

impl Ssa<NalgebraBackend> {
    /// Solver on the nalgebra backend, seeded from system entropy.
    pub fn new() -> Self {
        Self::with_backend(NalgebraBackend)
    }
}

impl Default for Ssa<NalgebraBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LinearAlgebra> Ssa<L> {
    pub fn with_backend(la: L) -> Self {
        Self {
            la,
            rng: ChaCha8Rng::from_entropy(),
            sink: Arc::new(TracingSink),
            stop: CancellationToken::new(),
        }
    }

    /// Reseed the generator that draws the random initial rotations.
    pub fn seed(mut self, seed: u64) -> Self {
        self.set_seed(seed);
        self
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn backend(&self) -> &L {
        &self.la
    }

    /// Handle that can stop a running fit from elsewhere.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Request that the running fit stop after its current restart.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// optimize — fit SSA to a time series.
    ///
    /// Parameters
    /// ----------
    /// - `params`: validated run parameters.
    /// - `series`: dimensions × time data.
    /// - `scheme`: how samples are grouped into epochs.
    ///
    /// Returns
    /// -------
    /// The [`Decomposition`]; `cancelled` is set if [`Ssa::stop`] cut the
    /// restarts short.
    ///
    /// Errors
    /// ------
    /// - `SsaError::InvalidStationarySources` unless `d < n`.
    /// - `SsaError::Moment` for an invalid epoching, including epochs with
    ///   fewer than `n` samples when covariances are used.
    /// - `SsaError::DeterminacyViolated` for too few epochs, unless ignored.
    /// - `SsaError::Optimization` / `Linalg` from the numerical layers.
    pub fn optimize(
        &mut self, params: &SsaParameters, series: &TimeSeries, scheme: &EpochScheme,
    ) -> SsaResult<Decomposition> {
        self.stop.reset();
        let n = series.dims();
        let samples = series.samples();
        params.check_dims(n)?;

        let partition = match scheme {
            EpochScheme::Equal(count) => EpochPartition::equal(samples, *count)?,
            EpochScheme::Heuristic => {
                let both = params.moments() == MomentSet::Both;
                let count = heuristic_epoch_count(n, samples, params.stationary_sources(), both);
                let (min_epochs, max_epochs) = heuristic_bounds(n, samples, params.stationary_sources(), both);
                self.sink.info(&format!(
                    "Heuristic epoch count: {count} (geometric mean of {min_epochs:.1} and {max_epochs:.1})"
                ));
                EpochPartition::equal(samples, count)?
            }
            EpochScheme::Custom(labels) => EpochPartition::from_labels(labels, samples)?,
        };
        self.sink.info(&format!(
            "Epochs: {}, average samples per epoch: {:.1}",
            partition.len(),
            partition.covered() as f64 / partition.len() as f64
        ));
        if params.uses_covariance() {
            partition.require_min_size(n)?;
        }
        self.check_determinacy(params, n, partition.len())?;

        self.sink.info("Calculating epoch covariance matrices and means...");
        let stats = EpochStatistics::estimate(&self.la, series, &partition, self.sink.as_ref())?;
        self.run(params, &stats)
    }

    /// optimize_moments — fit SSA to precomputed epoch statistics.
    ///
    /// Performs the same dimension and determinacy checks as
    /// [`Ssa::optimize`], then dispatches directly.
    pub fn optimize_moments(&mut self, params: &SsaParameters, stats: &EpochStatistics) -> SsaResult<Decomposition> {
        self.stop.reset();
        params.check_dims(stats.dims())?;
        self.check_determinacy(params, stats.dims(), stats.epochs())?;
        self.run(params, stats)
    }

    /// One manifold run targeting `subspace`, from `init` or a random start.
    pub fn optimize_once(
        &mut self, params: &SsaParameters, stats: &EpochStatistics, subspace: Subspace, init: Option<&Array2<f64>>,
    ) -> SsaResult<RunOutcome> {
        params.check_dims(stats.dims())?;
        let config = RunConfig {
            stationary_sources: params.stationary_sources(),
            subspace,
            moments: params.moments(),
        };
        Ok(manifold::optimize_once(&self.la, stats, &config, init, &mut self.rng)?)
    }

    fn check_determinacy(&self, params: &SsaParameters, dims: usize, epochs: usize) -> SsaResult<()> {
        if let Some(required) = params.check_determinacy(dims, epochs)? {
            self.sink.warn(&format!(
                "Too few epochs ({epochs}); at least {required} are needed for a determined solution. \
                 Spurious stationary directions are possible."
            ));
        }
        Ok(())
    }

    fn run(&mut self, params: &SsaParameters, stats: &EpochStatistics) -> SsaResult<Decomposition> {
        let epochs = EpochSummary {
            count: stats.epochs(),
            sizes: stats.sizes().to_vec(),
            regularization: stats.regularization(),
        };
        self.sink.info("Running SSA...");

        let decomposition = match (params.moments(), params.target()) {
            (MomentSet::MeanOnly, _) => {
                let sol = solve_mean_only(&self.la, stats, params.stationary_sources())?;
                Decomposition {
                    ps: sol.ps,
                    pn: sol.pn,
                    bs: sol.bs,
                    bn: sol.bn,
                    stationary: Some(sol.stationary),
                    non_stationary: Some(sol.non_stationary),
                    epochs,
                    method: SolveMethod::ClosedForm,
                    parameters: *params,
                    cancelled: false,
                }
            }
            (_, PrimaryTarget::Stationary) => self.run_dual_phase(params, stats, epochs)?,
            (_, PrimaryTarget::NonStationary) => {
                let phase = self.best_of_restarts(params, stats, Subspace::NonStationary, None)?;
                let best = phase.best;
                Decomposition {
                    non_stationary: Some(non_stationary_summary(&best)),
                    ps: best.ps,
                    pn: best.pn,
                    bs: best.bs,
                    bn: best.bn,
                    stationary: None,
                    epochs,
                    method: SolveMethod::NonStationaryOnly,
                    parameters: *params,
                    cancelled: phase.cancelled,
                }
            }
        };

        if decomposition.cancelled {
            self.sink.warn("SSA stopped on request; returning the best restart so far.");
        }
        Ok(decomposition)
    }

    fn run_dual_phase(
        &mut self, params: &SsaParameters, stats: &EpochStatistics, epochs: EpochSummary,
    ) -> SsaResult<Decomposition> {
        let d = params.stationary_sources();

        let phase_s = self.best_of_restarts(params, stats, Subspace::Stationary, None)?;
        let opt_s = phase_s.best;
        if phase_s.cancelled {
            return Ok(Decomposition {
                stationary: Some(stationary_summary(&opt_s)),
                ps: opt_s.ps,
                pn: opt_s.pn,
                bs: opt_s.bs,
                bn: opt_s.bn,
                non_stationary: None,
                epochs,
                method: SolveMethod::Iterative,
                parameters: *params,
                cancelled: true,
            });
        }

        let seed = stack_rows(opt_s.pn.view(), opt_s.ps.view())?;
        let phase_n = self.best_of_restarts(params, stats, Subspace::NonStationary, Some(seed))?;
        let opt_n = phase_n.best;

        let demixing = stack_rows(opt_s.ps.view(), opt_n.pn.view())?;
        let mixing = self.la.inverse(&demixing)?;
        Ok(Decomposition {
            ps: opt_s.ps.clone(),
            pn: opt_n.pn.clone(),
            bs: mixing.slice(s![.., ..d]).to_owned(),
            bn: mixing.slice(s![.., d..]).to_owned(),
            stationary: Some(stationary_summary(&opt_s)),
            non_stationary: Some(non_stationary_summary(&opt_n)),
            epochs,
            method: SolveMethod::Iterative,
            parameters: *params,
            cancelled: phase_n.cancelled,
        })
    }

    /// Restart loop of one phase; `first_init` seeds restart 1 only.
    fn best_of_restarts(
        &mut self, params: &SsaParameters, stats: &EpochStatistics, subspace: Subspace,
        first_init: Option<Array2<f64>>,
    ) -> SsaResult<PhaseRun> {
        let restarts = params.restarts();
        let (label, sign) = match subspace {
            Subspace::Stationary => ("stationary", 1.0),
            Subspace::NonStationary => ("non-stationary", -1.0),
        };
        self.sink.info(&format!("Optimizing the {label} sources..."));

        let mut best: Option<RunOutcome> = None;
        let mut cancelled = false;
        for restart in 0..restarts {
            let init = if restart == 0 { first_init.as_ref() } else { None };
            let outcome = self.optimize_once(params, stats, subspace, init)?;
            self.sink.info(&format!(
                "{label} restart {}/{restarts}: iterations={}, loss={:.6}",
                restart + 1,
                outcome.iterations,
                sign * outcome.loss
            ));
            if best.as_ref().map_or(true, |b| outcome.loss < b.loss) {
                best = Some(outcome);
            }
            if self.stop.is_cancelled() {
                cancelled = true;
                break;
            }
        }

        match best {
            Some(best) => Ok(PhaseRun { best, cancelled }),
            None => Err(SsaError::InvalidRestarts { restarts }),
        }
    }
}

fn stationary_summary(run: &RunOutcome) -> PhaseSummary {
    PhaseSummary {
        loss: run.loss,
        raw_loss: run.raw_loss,
        dof: run.dof,
        iterations: run.iterations,
        converged: run.converged,
    }
}

/// Non-stationary runs minimize the negated loss; report it positive.
fn non_stationary_summary(run: &RunOutcome) -> PhaseSummary {
    PhaseSummary { loss: -run.loss, ..stationary_summary(run) }
}
