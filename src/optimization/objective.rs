//! optimization::objective — SSA loss and gradient on the rotation manifold.
//!
//! Purpose
//! -------
//! Evaluate the non-stationarity of the leading `d` rows of the current
//! (whitened, rotated) coordinates, optionally after a further rotation
//! `R = exp(M)`, together with the manifold gradient at `M = 0`.
//!
//! Key behaviors
//! -------------
//! - For every epoch `i` with size `eᵢ`, rotated covariance `Sᵢ` and mean
//!   `μᵢ`, with `(·)_d` the leading block:
//!   `loss = Σ eᵢ·(−ln det((R·Sᵢ·Rᵀ)_d) + ‖(R·μᵢ)_d‖²)`,
//!   the mean term only when means are carried.
//! - The Euclidean derivative with respect to the leading rows,
//!   `G_d = 2·Σ eᵢ·(−((R·Sᵢ·Rᵀ)_d)⁻¹·(R·Sᵢ)_d + (R·μᵢ)_d·μᵢᵀ)`,
//!   is padded to `n×n` with zeros and projected onto skew-symmetric
//!   matrices as `G·Rᵀ − R·Gᵀ`.
//! - Every evaluation returns the rotated moments it computed
//!   ([`Evaluation::rotated`]) so an accepted line-search step can adopt
//!   them without recomputation.
//!
//! Invariants & assumptions
//! ------------------------
//! - `moments` are expressed in coordinates where the pooled covariance is
//!   the identity; rotations preserve positive definiteness of every `Sᵢ`.
//! - The log-determinant and inverse of each `d×d` block go through the
//!   provider's Cholesky factorization.
//!
//! Downstream usage
//! ----------------
//! - `manifold::optimize_once` evaluates with a gradient at the identity,
//!   then without gradients along the line search.
//! - `finite_diff` compares the analytic gradient against central
//!   differences of [`Objective::evaluate`].
use crate::{
    linalg::backend::LinearAlgebra,
    moments::estimator::EpochStatistics,
    optimization::{
        errors::{OptError, OptResult},
        types::MomentSet,
        validation::{validate_gradient, validate_loss},
    },
};
use ndarray::{s, Array1, Array2, Axis};

/// Epoch moments in the current optimization coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedMoments {
    pub covariances: Vec<Array2<f64>>,
    /// Present when the mean term is part of the objective.
    pub means: Option<Vec<Array1<f64>>>,
}

impl RotatedMoments {
    /// Moments after the change of basis `B`: `B·Sᵢ·Bᵀ` and `B·(μᵢ − μall)`.
    pub fn from_statistics(stats: &EpochStatistics, b: &Array2<f64>, moments: MomentSet) -> Self {
        let covariances = stats.covariances().iter().map(|s| b.dot(s).dot(&b.t())).collect();
        let means = moments.uses_mean().then(|| {
            stats.means().iter().map(|mu| b.dot(&(mu - stats.pooled_mean()))).collect()
        });
        Self { covariances, means }
    }

    pub fn epochs(&self) -> usize {
        self.covariances.len()
    }
}

/// Loss, optional gradient and the rotated moments of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub gradient: Option<Array2<f64>>,
    /// `R = exp(M)`, or the identity when no generator was given.
    pub rotation: Array2<f64>,
    pub rotated: RotatedMoments,
}

/// Objective over a fixed set of epochs.
#[derive(Debug, Clone, Copy)]
pub struct Objective<'a, L: LinearAlgebra + ?Sized> {
    la: &'a L,
    sizes: &'a [usize],
    dims: usize,
    rows: usize,
}

impl<'a, L: LinearAlgebra + ?Sized> Objective<'a, L> {
    /// Objective on the leading `rows` of `dims`-dimensional coordinates.
    ///
    /// # Errors
    /// [`OptError::InvalidSubspaceDim`] unless `1 ≤ rows ≤ dims`.
    pub fn new(la: &'a L, sizes: &'a [usize], dims: usize, rows: usize) -> OptResult<Self> {
        if rows == 0 || rows > dims {
            return Err(OptError::InvalidSubspaceDim { dim: rows, dims });
        }
        Ok(Self { la, sizes, dims, rows })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// evaluate — loss (and optionally gradient) after rotating by `exp(M)`.
    ///
    /// Parameters
    /// ----------
    /// - `moments`: current rotated moments, one entry per epoch size.
    /// - `generator`: skew-symmetric `M`; `None` means `R = I`.
    /// - `with_gradient`: compute the projected gradient. Only meaningful
    ///   at `R = I`, which is how the optimizer calls it.
    ///
    /// Errors
    /// ------
    /// - `OptError::EpochCountMismatch`, `GeneratorShapeMismatch` for
    ///   malformed inputs.
    /// - `OptError::Linalg` when `expm` or a Cholesky factorization fails.
    /// - `OptError::NonFiniteLoss` / `InvalidGradient` for NaN/±∞ results.
    pub fn evaluate(
        &self, moments: &RotatedMoments, generator: Option<&Array2<f64>>, with_gradient: bool,
    ) -> OptResult<Evaluation> {
        let (n, d) = (self.dims, self.rows);
        if moments.epochs() != self.sizes.len() {
            return Err(OptError::EpochCountMismatch { moments: moments.epochs(), sizes: self.sizes.len() });
        }
        let rotation = match generator {
            Some(m) if m.dim() != (n, n) => {
                return Err(OptError::GeneratorShapeMismatch { expected: n, found: m.dim() });
            }
            Some(m) => self.la.expm(m)?,
            None => Array2::eye(n),
        };

        let mut loss = 0.0;
        let mut grad_rows = with_gradient.then(|| Array2::<f64>::zeros((d, n)));
        let mut covariances = Vec::with_capacity(moments.epochs());
        let mut means = moments.means.as_ref().map(|m| Vec::with_capacity(m.len()));

        for (i, cov) in moments.covariances.iter().enumerate() {
            let e = self.sizes[i] as f64;
            let rs = rotation.dot(cov);
            let rsrt = rs.dot(&rotation.t());
            let block = rsrt.slice(s![..d, ..d]).to_owned();

            loss -= e * self.la.log_det_spd(&block)?;
            if let Some(g) = grad_rows.as_mut() {
                let inv = self.la.inverse_spd(&block)?;
                g.scaled_add(-e, &inv.dot(&rs.slice(s![..d, ..])));
            }

            if let (Some(input), Some(output)) = (moments.means.as_ref(), means.as_mut()) {
                let mu = &input[i];
                let rmu = rotation.dot(mu);
                let head = rmu.slice(s![..d]);
                loss += e * head.dot(&head);
                if let Some(g) = grad_rows.as_mut() {
                    let outer = head.insert_axis(Axis(1)).dot(&mu.view().insert_axis(Axis(0)));
                    g.scaled_add(e, &outer);
                }
                output.push(rmu);
            }
            covariances.push(rsrt);
        }
        validate_loss(loss)?;

        let gradient = match grad_rows {
            Some(g) => {
                let mut full = Array2::<f64>::zeros((n, n));
                full.slice_mut(s![..d, ..]).assign(&(g * 2.0));
                let projected = full.dot(&rotation.t()) - rotation.dot(&full.t());
                validate_gradient(&projected, n)?;
                Some(projected)
            }
            None => None,
        };

        Ok(Evaluation { loss, gradient, rotation, rotated: RotatedMoments { covariances, means } })
    }

    /// Loss and projected gradient at `R = I`.
    pub fn value_and_gradient(&self, moments: &RotatedMoments) -> OptResult<(f64, Array2<f64>)> {
        let eval = self.evaluate(moments, None, true)?;
        let grad = eval.gradient.ok_or(OptError::MissingGradient)?;
        Ok((eval.loss, grad))
    }

    /// Loss after rotating by `exp(M)`, without the gradient.
    pub fn value_at(&self, moments: &RotatedMoments, generator: &Array2<f64>) -> OptResult<f64> {
        Ok(self.evaluate(moments, Some(generator), false)?.loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{backend::NalgebraBackend, matrix::max_abs_diff};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The loss on diagonal covariances where ln det is closed form.
    // - The mean term and its exclusion.
    // - Antisymmetry of the projected gradient and its vanishing at a
    //   stationary optimum.
    // - Rotation bookkeeping of the returned moments.
    //
    // They intentionally DO NOT cover:
    // - Agreement with finite differences (see `optimization::finite_diff`).
    // -------------------------------------------------------------------------

    fn diag_moments(with_means: bool) -> RotatedMoments {
        RotatedMoments {
            covariances: vec![array![[2.0, 0.0], [0.0, 0.5]], array![[0.5, 0.0], [0.0, 2.0]]],
            means: with_means.then(|| vec![array![1.0, 0.0], array![0.0, 3.0]]),
        }
    }

    #[test]
    // Purpose
    // -------
    // The covariance term is −Σ eᵢ·ln det of the leading block.
    //
    // Given
    // -----
    // - Two diagonal epochs with leading variances 2 and 0.5, sizes 10 and 30.
    //
    // Expect
    // ------
    // - loss = −10·ln 2 − 30·ln 0.5 = 20·ln 2.
    fn covariance_term_matches_closed_form() {
        // Arrange
        let sizes = [10, 30];
        let obj = Objective::new(&NalgebraBackend, &sizes, 2, 1).unwrap();

        // Act
        let eval = obj.evaluate(&diag_moments(false), None, false).unwrap();

        // Assert
        assert_relative_eq!(eval.loss, 20.0 * 2.0_f64.ln(), epsilon = 1e-12);
        assert!(eval.gradient.is_none());
        assert!(eval.rotated.means.is_none());
    }

    #[test]
    // Purpose
    // -------
    // The mean term adds Σ eᵢ·‖(μᵢ)_d‖².
    //
    // Given
    // -----
    // - Same epochs with means [1, 0] and [0, 3].
    //
    // Expect
    // ------
    // - loss = 20·ln 2 + 10·1 + 30·0.
    fn mean_term_uses_leading_rows_only() {
        let sizes = [10, 30];
        let obj = Objective::new(&NalgebraBackend, &sizes, 2, 1).unwrap();

        let eval = obj.evaluate(&diag_moments(true), None, false).unwrap();

        assert_relative_eq!(eval.loss, 20.0 * 2.0_f64.ln() + 10.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Identical epochs at the identity covariance are a stationary point.
    //
    // Given
    // -----
    // - Three epochs with `Sᵢ = I₃`, zero means, d = 2.
    //
    // Expect
    // ------
    // - loss = 0 and a zero gradient.
    fn stationary_configuration_has_zero_loss_and_gradient() {
        let sizes = [5, 5, 5];
        let moments = RotatedMoments {
            covariances: vec![Array2::eye(3); 3],
            means: Some(vec![Array1::zeros(3); 3]),
        };
        let obj = Objective::new(&NalgebraBackend, &sizes, 3, 2).unwrap();

        let (loss, grad) = obj.value_and_gradient(&moments).unwrap();

        assert_relative_eq!(loss, 0.0, epsilon = 1e-12);
        assert!(grad.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    // Purpose
    // -------
    // The projected gradient is skew-symmetric.
    //
    // Given
    // -----
    // - Non-diagonal covariances and non-zero means in 3 dimensions.
    //
    // Expect
    // ------
    // - `G = −Gᵀ` to round-off.
    fn projected_gradient_is_antisymmetric() {
        let sizes = [8, 12];
        let moments = RotatedMoments {
            covariances: vec![
                array![[1.5, 0.2, 0.1], [0.2, 0.8, -0.3], [0.1, -0.3, 1.1]],
                array![[0.6, -0.1, 0.0], [-0.1, 1.3, 0.2], [0.0, 0.2, 0.9]],
            ],
            means: Some(vec![array![0.4, -0.2, 0.1], array![-0.3, 0.5, 0.2]]),
        };
        let obj = Objective::new(&NalgebraBackend, &sizes, 3, 2).unwrap();

        let (_, grad) = obj.value_and_gradient(&moments).unwrap();

        let sym = &grad + &grad.t();
        assert!(sym.iter().all(|v| v.abs() < 1e-12));
        assert!(grad.iter().any(|v| v.abs() > 1e-6));
    }

    #[test]
    // Purpose
    // -------
    // Returned moments are the inputs rotated by `exp(M)`.
    //
    // Given
    // -----
    // - A quarter-turn generator M = [[0, π/2], [−π/2, 0]].
    //
    // Expect
    // ------
    // - The quarter turn swaps the diagonal variances and maps the first
    //   mean onto the second axis.
    fn evaluation_returns_rotated_moments() {
        let sizes = [10, 30];
        let obj = Objective::new(&NalgebraBackend, &sizes, 2, 1).unwrap();
        let half_pi = std::f64::consts::FRAC_PI_2;
        let m = array![[0.0, half_pi], [-half_pi, 0.0]];

        let eval = obj.evaluate(&diag_moments(true), Some(&m), false).unwrap();

        let swapped = array![[0.5, 0.0], [0.0, 2.0]];
        assert!(max_abs_diff(&eval.rotated.covariances[0], &swapped) < 1e-10);
        let means = eval.rotated.means.unwrap();
        assert_relative_eq!(means[0][0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(means[0][1].abs(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(eval.loss, -20.0 * 2.0_f64.ln() + 30.0 * 9.0, epsilon = 1e-8);
    }

    #[test]
    // Purpose
    // -------
    // Malformed inputs fail before any algebra.
    //
    // Given
    // -----
    // - rows = 0; sizes for one epoch but moments for two; a 3x3 generator
    //   in two dimensions.
    //
    // Expect
    // ------
    // - `InvalidSubspaceDim`, `EpochCountMismatch`, `GeneratorShapeMismatch`.
    fn malformed_inputs_are_rejected() {
        let sizes = [10];
        assert!(matches!(
            Objective::new(&NalgebraBackend, &sizes, 2, 0),
            Err(OptError::InvalidSubspaceDim { dim: 0, dims: 2 })
        ));

        let obj = Objective::new(&NalgebraBackend, &sizes, 2, 1).unwrap();
        assert_eq!(
            obj.evaluate(&diag_moments(false), None, false),
            Err(OptError::EpochCountMismatch { moments: 2, sizes: 1 })
        );

        let sizes2 = [10, 30];
        let obj2 = Objective::new(&NalgebraBackend, &sizes2, 2, 1).unwrap();
        let big = Array2::<f64>::zeros((3, 3));
        assert_eq!(
            obj2.evaluate(&diag_moments(false), Some(&big), false),
            Err(OptError::GeneratorShapeMismatch { expected: 2, found: (3, 3) })
        );
    }
}
