//! Validation helpers for the SSA objective and optimizer.
//!
//! - **Objective values**: [`validate_loss`] rejects NaN/±∞.
//! - **Gradients**: [`validate_gradient`] enforces an `n×n` shape and finite
//!   entries.
//! - **Run configuration**: [`validate_run`] checks `1 ≤ d < n` and the
//!   shape of an optional initial rotation.
//!
//! Each helper reports the first offending value through a dedicated
//! [`OptError`] variant.
use crate::optimization::errors::{OptError, OptResult};
use ndarray::Array2;

/// Validate that an objective value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteLoss`] if the value is NaN or infinite.
pub fn validate_loss(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteLoss { value });
    }
    Ok(())
}

/// Validate a gradient matrix against shape and finiteness.
///
/// # Errors
/// - [`OptError::GradientShapeMismatch`] if `grad` is not `dims×dims`.
/// - [`OptError::InvalidGradient`] for the first non-finite entry.
pub fn validate_gradient(grad: &Array2<f64>, dims: usize) -> OptResult<()> {
    if grad.dim() != (dims, dims) {
        return Err(OptError::GradientShapeMismatch { expected: dims, found: grad.dim() });
    }
    if let Some(((row, col), &value)) = grad.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidGradient { row, col, value });
    }
    Ok(())
}

/// Validate the inputs of a single manifold run.
///
/// # Errors
/// - [`OptError::InvalidStationarySources`] unless `1 ≤ stationary < dims`.
/// - [`OptError::InvalidInitialRotation`] if `init` is not `dims×dims`.
pub fn validate_run(dims: usize, stationary: usize, init: Option<&Array2<f64>>) -> OptResult<()> {
    if stationary == 0 || stationary >= dims {
        return Err(OptError::InvalidStationarySources { sources: stationary, dims });
    }
    if let Some(b) = init {
        if b.dim() != (dims, dims) {
            return Err(OptError::InvalidInitialRotation { expected: dims, found: b.dim() });
        }
    }
    Ok(())
}
