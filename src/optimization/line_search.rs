//! optimization::line_search — backtracking Armijo search along a geodesic.
//!
//! Purpose
//! -------
//! Pick the step `t` along a normalized search direction. The first trial
//! is `t = 1`; each rejection shrinks `t` by [`STEP_SHRINK`], up to
//! [`MAX_BACKTRACKS`] trials. A step is accepted when
//! `loss(t) ≤ loss(0) + ARMIJO_SLOPE·t·slope`, where `slope` is the skew
//! inner product of gradient and search direction.
//!
//! Conventions
//! -----------
//! - The search is generic over what a trial produces, so the manifold
//!   driver can carry the rotated moments of the accepted trial along.
//! - NaN trial losses never satisfy the test.
use crate::optimization::errors::OptResult;

/// Sufficient-decrease constant of the Armijo test.
pub const ARMIJO_SLOPE: f64 = 0.5 * (0.01 + 0.3);

/// Factor applied to `t` after a rejected trial.
pub const STEP_SHRINK: f64 = 0.4;

/// Number of trials before the search gives up.
pub const MAX_BACKTRACKS: usize = 10;

/// An accepted trial.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedStep<T> {
    pub step: f64,
    pub loss: f64,
    pub trial: T,
}

/// backtrack — run the Armijo search.
///
/// Parameters
/// ----------
/// - `loss0`: loss at `t = 0`.
/// - `slope`: directional derivative at `t = 0`; negative for a descent
///   direction.
/// - `trial`: evaluates the loss (and any payload) at step `t`.
///
/// Returns
/// -------
/// `Ok(Some(step))` for the first accepted trial, `Ok(None)` if all
/// [`MAX_BACKTRACKS`] trials were rejected.
///
/// Errors
/// ------
/// Propagates the first error returned by `trial`.
pub fn backtrack<T, F>(loss0: f64, slope: f64, mut trial: F) -> OptResult<Option<AcceptedStep<T>>>
where
    F: FnMut(f64) -> OptResult<(f64, T)>,
{
    let mut step = 1.0;
    for attempt in 0..MAX_BACKTRACKS {
        let (loss, payload) = trial(step)?;
        if loss <= loss0 + ARMIJO_SLOPE * step * slope {
            return Ok(Some(AcceptedStep { step, loss, trial: payload }));
        }
        tracing::trace!(attempt, step, loss, "line search rejected step");
        step *= STEP_SHRINK;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Acceptance of the full step on a well-scaled quadratic.
    // - Backtracking on an overshooting step.
    // - Exhaustion on an ascent direction and error propagation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A well-scaled step is accepted immediately.
    //
    // Given
    // -----
    // - f(t) = (1 − t)², slope −2 at t = 0.
    //
    // Expect
    // ------
    // - t = 1 accepted with loss 0.
    fn full_step_is_accepted_on_quadratic() {
        let result = backtrack(1.0, -2.0, |t| Ok(((1.0 - t).powi(2), ()))).unwrap().unwrap();

        assert_eq!(result.step, 1.0);
        assert_eq!(result.loss, 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Overshooting steps are shrunk by 0.4 until the test passes.
    //
    // Given
    // -----
    // - f(t) = (1 − 10t)², slope −20 at t = 0.
    //
    // Expect
    // ------
    // - t = 0.4² = 0.16 is the first accepted step (t = 1 and 0.4 overshoot).
    fn overshooting_step_is_backtracked() {
        let mut calls = 0;

        let result = backtrack(1.0, -20.0, |t| {
            calls += 1;
            Ok(((1.0 - 10.0 * t).powi(2), t))
        })
        .unwrap()
        .unwrap();

        assert_relative_eq!(result.step, 0.16, epsilon = 1e-12);
        assert_relative_eq!(result.trial, 0.16, epsilon = 1e-12);
        assert_eq!(calls, 3);
    }

    #[test]
    // Purpose
    // -------
    // An ascent direction exhausts the search.
    //
    // Given
    // -----
    // - f(t) = 1 + t with a (wrongly) negative slope.
    //
    // Expect
    // ------
    // - `None` after exactly `MAX_BACKTRACKS` trials.
    fn ascent_direction_exhausts_search() {
        let mut calls = 0;

        let result = backtrack(1.0, -1.0, |t| {
            calls += 1;
            Ok((1.0 + t, ()))
        })
        .unwrap();

        assert!(result.is_none());
        assert_eq!(calls, MAX_BACKTRACKS);
    }

    #[test]
    // Purpose
    // -------
    // Trial errors abort the search.
    //
    // Given
    // -----
    // - A trial that always fails.
    //
    // Expect
    // ------
    // - The same error is returned.
    fn trial_error_is_propagated() {
        let err = backtrack::<(), _>(1.0, -1.0, |_| Err(OptError::NonFiniteLoss { value: f64::NAN }))
            .expect_err("trial error");

        assert!(matches!(err, OptError::NonFiniteLoss { .. }));
    }
}
