//! optimization::manifold — one conjugate-gradient run on the rotation group.
//!
//! Purpose
//! -------
//! Find a demixing matrix `B = R·W` whose leading rows are as stationary
//! (or, for [`Subspace::NonStationary`], as non-stationary) as possible,
//! starting from a random rotation of the whitened data or from a supplied
//! initial matrix.
//!
//! Key behaviors
//! -------------
//! - Each iteration evaluates the normalized loss and manifold gradient at
//!   the identity, builds a Polak–Ribière direction (restarted as steepest
//!   descent when it points uphill), normalizes it and runs a backtracking
//!   Armijo search over `R = exp(t·search)`.
//! - An accepted step replaces the rotated moments by those of the trial
//!   and left-multiplies `B` by the trial rotation.
//! - The run stops when the line search finds no acceptable step, when the
//!   accepted loss does not decrease, or when the relative decrease falls
//!   below [`MIN_RELATIVE_DECREASE`]. There is no iteration cap.
//! - It also stops, as converged, at a point whose raw loss is `≤ 0` or
//!   whose search direction is not finite. Trial losses are never clamped,
//!   so a negative trial loss is NaN and fails the Armijo test.
//! - Non-stationary runs minimize the negated loss and gradient, and report
//!   their optimized block as `Pn`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `B` is always a rotation times the whitening matrix. A supplied start
//!   `B₀` is replaced by `Q·W`, where `Q` is the row-wise Gram–Schmidt
//!   orthonormalization of `B₀·W⁻¹`; this keeps the span of its leading
//!   rows and leaves a start that is already of the form `R·W` unchanged.
//! - The reported loss is the normalized loss at the returned `B`.
//!
//! Downstream usage
//! ----------------
//! - `ssa::solver::Ssa` runs this repeatedly with fresh random starts and
//!   keeps the lowest loss per phase.
use crate::{
    linalg::{
        backend::LinearAlgebra,
        matrix::skew_inner,
        rotation::{orthonormalize_rows, random_rotation},
    },
    moments::estimator::EpochStatistics,
    optimization::{
        conjugate::{descent_direction, normalize_direction, ConjugateState},
        errors::OptResult,
        line_search::backtrack,
        normalization::{degrees_of_freedom, normalize_gradient, normalize_loss, reported_loss},
        objective::{Objective, RotatedMoments},
        types::{RunConfig, RunOutcome, Subspace},
        validation::validate_run,
    },
};
use ndarray::{s, Array2};
use rand::Rng;

/// Relative loss decrease below which a run counts as converged.
pub const MIN_RELATIVE_DECREASE: f64 = 1e-8;

/// optimize_once — a single manifold conjugate-gradient run.
///
/// Parameters
/// ----------
/// - `la`: linear-algebra provider.
/// - `stats`: epoch moments with pooled mean and whitening matrix.
/// - `config`: stationary count `d`, optimized subspace and moment set.
/// - `init`: optional `n×n` starting demixing matrix, re-orthonormalized
///   against the whitening matrix; when `None`, a random rotation drawn
///   from `rng` is applied to the whitening matrix.
/// - `rng`: source of the random start.
///
/// Returns
/// -------
/// [`RunOutcome`] with `Ps`/`Pn` the rows of the final `B`, `Bs`/`Bn` the
/// matching columns of `B⁻¹`, the normalized loss, iteration count and the
/// convergence flag.
///
/// Errors
/// ------
/// - `OptError::InvalidStationarySources` unless `1 ≤ d < n`.
/// - `OptError::InvalidInitialRotation` for a mis-shaped `init`.
/// - `OptError::Linalg` / `NonFiniteLoss` from the objective.
/// - `Linalg(Singular)` / `Linalg(NonFinite)` if `init` is not invertible
///   or not finite.
pub fn optimize_once<L, R>(
    la: &L, stats: &EpochStatistics, config: &RunConfig, init: Option<&Array2<f64>>, rng: &mut R,
) -> OptResult<RunOutcome>
where
    L: LinearAlgebra + ?Sized,
    R: Rng + ?Sized,
{
    let n = stats.dims();
    validate_run(n, config.stationary_sources, init)?;
    let rows = config.optimized_rows(n);
    let sign = match config.subspace {
        Subspace::Stationary => 1.0,
        Subspace::NonStationary => -1.0,
    };
    let dof = degrees_of_freedom(stats.epochs(), rows, config.moments);

    let w = stats.whitening();
    let mut b = match init {
        Some(b0) => {
            let rotation = b0.dot(&la.inverse(w)?);
            orthonormalize_rows(&rotation)?.dot(w)
        }
        None => random_rotation(la, n, rng)?.dot(w),
    };
    let mut moments = RotatedMoments::from_statistics(stats, &b, config.moments);
    let objective = Objective::new(la, stats.sizes(), n, rows)?;

    let mut previous: Option<ConjugateState> = None;
    let mut iterations = 0;
    let (loss, raw_loss) = loop {
        let (raw, raw_grad) = objective.value_and_gradient(&moments)?;
        if raw <= 0.0 {
            tracing::debug!(iterations, raw, "raw loss is not positive, stopping");
            break (sign * reported_loss(raw, dof), raw);
        }
        let loss = sign * normalize_loss(raw, dof);
        let gradient = normalize_gradient(&raw_grad, raw) * sign;
        let direction = descent_direction(&gradient, previous.as_ref());
        let search = normalize_direction(&direction);
        let slope = skew_inner(&gradient, &search);
        if !slope.is_finite() || search.iter().any(|v| !v.is_finite()) {
            tracing::debug!(iterations, loss, "search direction is not finite, stopping");
            break (loss, raw);
        }

        let step = backtrack(loss, slope, |t| {
            let generator = &search * t;
            let eval = objective.evaluate(&moments, Some(&generator), false)?;
            Ok((sign * normalize_loss(eval.loss, dof), eval))
        })?;

        let Some(accepted) = step else {
            tracing::debug!(iterations, loss, "no acceptable step along search direction");
            break (loss, raw);
        };
        if accepted.loss >= loss || ((loss - accepted.loss) / loss).abs() < MIN_RELATIVE_DECREASE {
            break (loss, raw);
        }

        b = accepted.trial.rotation.dot(&b);
        moments = accepted.trial.rotated;
        previous = Some(ConjugateState { gradient, direction });
        iterations += 1;
        tracing::debug!(iteration = iterations, loss = accepted.loss, step = accepted.step, "accepted step");
    };

    let mixing = la.inverse(&b)?;
    let head = b.slice(s![..rows, ..]).to_owned();
    let tail = b.slice(s![rows.., ..]).to_owned();
    let head_cols = mixing.slice(s![.., ..rows]).to_owned();
    let tail_cols = mixing.slice(s![.., rows..]).to_owned();
    let (ps, pn, bs, bn) = match config.subspace {
        Subspace::Stationary => (head, tail, head_cols, tail_cols),
        Subspace::NonStationary => (tail, head, tail_cols, head_cols),
    };

    Ok(RunOutcome { ps, pn, bs, bn, loss, raw_loss, dof, iterations, converged: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        linalg::{backend::NalgebraBackend, matrix::max_abs_diff},
        logging::NullSink,
        optimization::{errors::OptError, types::MomentSet},
    };
    use ndarray::{array, Array1};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Recovery of a known stationary axis from precomputed moments.
    // - The non-stationary variant reporting its block as `Pn`.
    // - Demixing/mixing consistency of the outcome.
    // - Validation of d and of the initial matrix.
    // - Re-orthonormalization of a start that is not a rotation of the
    //   whitened data, and stopping at a zero raw loss.
    // -------------------------------------------------------------------------

    /// Epochs where channel 0 is stationary and channel 1 changes variance.
    fn axis_aligned_stats() -> EpochStatistics {
        let covs = [0.2, 3.0, 0.5, 4.0].iter().map(|&v| array![[1.0, 0.0], [0.0, v]]).collect();
        let means = vec![Array1::zeros(2); 4];
        EpochStatistics::from_moments(&NalgebraBackend, covs, means, vec![50; 4], &NullSink).unwrap()
    }

    fn config(subspace: Subspace) -> RunConfig {
        RunConfig { stationary_sources: 1, subspace, moments: MomentSet::CovarianceOnly }
    }

    #[test]
    // Purpose
    // -------
    // A stationary run aligns Ps with the stationary channel.
    //
    // Given
    // -----
    // - Four epochs; channel 0 has constant variance, channel 1 does not.
    // - A seeded random start.
    //
    // Expect
    // ------
    // - |Ps[0,1]| is small relative to |Ps[0,0]|; the run converged.
    fn stationary_run_recovers_constant_variance_axis() {
        // Arrange
        let stats = axis_aligned_stats();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        // Act
        let out = optimize_once(&NalgebraBackend, &stats, &config(Subspace::Stationary), None, &mut rng)
            .unwrap();

        // Assert
        assert!(out.converged);
        assert_eq!(out.ps.dim(), (1, 2));
        assert_eq!(out.pn.dim(), (1, 2));
        assert!(out.ps[[0, 1]].abs() < 0.05 * out.ps[[0, 0]].abs(), "Ps = {:?}", out.ps);
        assert_eq!(out.dof, 4);
    }

    #[test]
    // Purpose
    // -------
    // A non-stationary run puts its optimized block into Pn.
    //
    // Given
    // -----
    // - The same epochs, Subspace::NonStationary.
    //
    // Expect
    // ------
    // - Pn is aligned with channel 1; the reported loss is the negated
    //   normalized loss (negative for a clearly non-stationary direction).
    fn non_stationary_run_reports_block_as_pn() {
        let stats = axis_aligned_stats();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let out = optimize_once(&NalgebraBackend, &stats, &config(Subspace::NonStationary), None, &mut rng)
            .unwrap();

        assert!(out.pn[[0, 0]].abs() < 0.05 * out.pn[[0, 1]].abs(), "Pn = {:?}", out.pn);
        assert!(out.loss < 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Projections and bases are mutually inverse.
    //
    // Given
    // -----
    // - Any completed run.
    //
    // Expect
    // ------
    // - [Ps; Pn]·[Bs Bn] = I.
    fn projections_and_bases_are_inverse() {
        let stats = axis_aligned_stats();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let out = optimize_once(&NalgebraBackend, &stats, &config(Subspace::Stationary), None, &mut rng)
            .unwrap();

        let p = ndarray::concatenate![ndarray::Axis(0), out.ps, out.pn];
        let basis = ndarray::concatenate![ndarray::Axis(1), out.bs, out.bn];
        assert!(max_abs_diff(&p.dot(&basis), &Array2::eye(2)) < 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Starting at the optimum stops without moving.
    //
    // Given
    // -----
    // - init = whitening matrix, already aligned with the stationary axis.
    //
    // Expect
    // ------
    // - Zero accepted iterations and Ps equal to the first row of W.
    fn run_started_at_optimum_stays_put() {
        let stats = axis_aligned_stats();
        let init = stats.whitening().clone();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = optimize_once(&NalgebraBackend, &stats, &config(Subspace::Stationary), Some(&init), &mut rng)
            .unwrap();

        assert_eq!(out.iterations, 0);
        assert!(max_abs_diff(&out.ps, &init.slice(s![..1, ..]).to_owned()) < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Degenerate splits and bad starts are configuration errors.
    //
    // Given
    // -----
    // - d = 2 in two dimensions; a 3x3 initial matrix.
    //
    // Expect
    // ------
    // - `InvalidStationarySources` and `InvalidInitialRotation`.
    fn invalid_configuration_is_rejected() {
        let stats = axis_aligned_stats();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let bad = RunConfig { stationary_sources: 2, ..config(Subspace::Stationary) };

        let err = optimize_once(&NalgebraBackend, &stats, &bad, None, &mut rng).expect_err("d = n");
        assert_eq!(err, OptError::InvalidStationarySources { sources: 2, dims: 2 });

        let init = Array2::<f64>::eye(3);
        let err = optimize_once(&NalgebraBackend, &stats, &config(Subspace::Stationary), Some(&init), &mut rng)
            .expect_err("3x3 start");
        assert_eq!(err, OptError::InvalidInitialRotation { expected: 2, found: (3, 3) });
    }

    #[test]
    // Purpose
    // -------
    // A start that is not of the form `R·W` is mapped back onto the
    // rotation group before the run, keeping its leading row direction.
    //
    // Given
    // -----
    // - init = [2·W₀; W₀ + W₁], where Wᵢ are the rows of the whitening
    //   matrix. Its scaled first row alone would give a negative raw loss.
    //
    // Expect
    // ------
    // - The run succeeds without moving: zero iterations, Ps = W₀ and a
    //   reported loss of −√(2k − 1) at raw loss 0.
    // - [Ps; Pn]·W⁻¹ is orthogonal.
    fn non_rotation_start_is_orthonormalized() {
        // Arrange
        let la = NalgebraBackend;
        let stats = axis_aligned_stats();
        let w = stats.whitening().clone();
        let w0 = w.row(0).to_owned();
        let w1 = w.row(1).to_owned();
        let init = ndarray::stack![ndarray::Axis(0), &w0 * 2.0, &w0 + &w1];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        // Act
        let out = optimize_once(&la, &stats, &config(Subspace::Stationary), Some(&init), &mut rng).unwrap();

        // Assert
        assert!(out.converged);
        assert_eq!(out.iterations, 0);
        assert!(max_abs_diff(&out.ps, &w.slice(s![..1, ..]).to_owned()) < 1e-10, "Ps = {:?}", out.ps);
        assert!(out.raw_loss.abs() < 1e-10);
        assert!((out.loss + 7.0_f64.sqrt()).abs() < 1e-4, "loss = {}", out.loss);
        let p = ndarray::concatenate![ndarray::Axis(0), out.ps, out.pn];
        let q = p.dot(&la.inverse(&w).unwrap());
        assert!(max_abs_diff(&q.dot(&q.t()), &Array2::eye(2)) < 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // A start whose rows are linearly dependent cannot be orthonormalized.
    //
    // Given
    // -----
    // - init with two equal rows.
    //
    // Expect
    // ------
    // - `OptError::Linalg(Singular)`.
    fn dependent_start_is_rejected() {
        let stats = axis_aligned_stats();
        let init = array![[1.0, 1.0], [1.0, 1.0]];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let err = optimize_once(&NalgebraBackend, &stats, &config(Subspace::Stationary), Some(&init), &mut rng)
            .expect_err("rank-one start");

        assert!(matches!(err, OptError::Linalg(crate::linalg::errors::LinalgError::Singular { .. })), "{err:?}");
    }
}
