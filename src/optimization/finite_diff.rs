//! optimization::finite_diff — numerical check of the manifold gradient.
//!
//! Purpose
//! -------
//! Approximate the derivative of the raw SSA objective with respect to the
//! `n(n−1)/2` free coordinates of a skew-symmetric generator by central
//! differences, and compare it with the analytic projected gradient.
//!
//! Key behaviors
//! -------------
//! - Coordinates are the strict upper triangle of `M` in row-major order;
//!   `M = Σ aᵢⱼ·(Eᵢⱼ − Eⱼᵢ)`.
//! - At `M = 0`, `∂loss/∂aᵢⱼ` equals entry `(i, j)` of the analytic
//!   gradient, so the numerical result is assembled back into a
//!   skew-symmetric matrix of the same layout.
//! - Errors raised by the objective inside the finite-difference closure
//!   are captured in a `RefCell` and surfaced after the sweep.
//!
//! Downstream usage
//! ----------------
//! - Diagnostics and tests call [`max_gradient_error`] to validate the
//!   objective on concrete moments.
use crate::{
    linalg::{backend::LinearAlgebra, matrix::max_abs_diff},
    optimization::{
        errors::OptResult,
        objective::{Objective, RotatedMoments},
        validation::validate_gradient,
    },
};
use finitediff::FiniteDiff;
use ndarray::Array2;
use std::cell::RefCell;

/// Skew-symmetric generator from its upper-triangle coordinates.
pub fn generator_from_coordinates(n: usize, coords: &[f64]) -> Array2<f64> {
    let mut m = Array2::<f64>::zeros((n, n));
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let a = coords.get(k).copied().unwrap_or(0.0);
            m[[i, j]] = a;
            m[[j, i]] = -a;
            k += 1;
        }
    }
    m
}

/// Upper-triangle coordinates of a (skew) matrix.
pub fn coordinates_of(m: &Array2<f64>) -> Vec<f64> {
    let n = m.nrows();
    let mut coords = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            coords.push(m[[i, j]]);
        }
    }
    coords
}

/// numerical_gradient — central-difference gradient at `M = 0`.
///
/// Parameters
/// ----------
/// - `objective`: objective over the epochs of `moments`.
/// - `moments`: current rotated moments.
///
/// Returns
/// -------
/// `OptResult<Array2<f64>>`
///   Skew-symmetric `n×n` matrix laid out like the analytic gradient.
///
/// Errors
/// ------
/// - The first `OptError` raised by the objective during the sweep.
/// - `OptError::InvalidGradient` if the approximation is not finite.
pub fn numerical_gradient<L: LinearAlgebra + ?Sized>(
    objective: &Objective<'_, L>, moments: &RotatedMoments,
) -> OptResult<Array2<f64>> {
    let n = objective.dims();
    let closure_err = RefCell::new(None);
    let f = |coords: &Vec<f64>| -> f64 {
        let generator = generator_from_coordinates(n, coords);
        match objective.value_at(moments, &generator) {
            Ok(value) => value,
            Err(err) => {
                closure_err.borrow_mut().get_or_insert(err);
                f64::NAN
            }
        }
    };
    let origin = vec![0.0; n * n.saturating_sub(1) / 2];
    let fd = origin.central_diff(&f);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    let grad = generator_from_coordinates(n, &fd);
    validate_gradient(&grad, n)?;
    Ok(grad)
}

/// Largest absolute deviation between analytic and numerical gradients.
pub fn max_gradient_error<L: LinearAlgebra + ?Sized>(
    objective: &Objective<'_, L>, moments: &RotatedMoments,
) -> OptResult<f64> {
    let (_, analytic) = objective.value_and_gradient(moments)?;
    let numerical = numerical_gradient(objective, moments)?;
    Ok(max_abs_diff(&analytic, &numerical))
}
