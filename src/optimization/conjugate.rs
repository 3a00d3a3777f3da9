//! optimization::conjugate — Polak–Ribière directions on skew matrices.
//!
//! The first direction is steepest descent `−∇`. Later directions add the
//! previous (unnormalized) direction scaled by
//! `γ = ⟨∇, ∇ − ∇old⟩ / ⟨∇old, ∇old⟩`. Search steps use the direction
//! divided by `√2·‖·‖_F`.
//!
//! [`descent_direction`] falls back to steepest descent whenever the
//! Polak–Ribière combination is not a descent direction, which happens
//! after a line-search step overshoots a minimum along a one-dimensional
//! manifold (n = 2).
use crate::linalg::matrix::frobenius_dot;
use ndarray::Array2;

/// Gradient and direction of the previous iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConjugateState {
    pub gradient: Array2<f64>,
    pub direction: Array2<f64>,
}

/// Polak–Ribière direction for `gradient`.
pub fn polak_ribiere(gradient: &Array2<f64>, previous: Option<&ConjugateState>) -> Array2<f64> {
    let steepest = gradient.mapv(|g| -g);
    match previous {
        None => steepest,
        Some(prev) => {
            let denom = frobenius_dot(&prev.gradient, &prev.gradient);
            if denom <= 0.0 {
                return steepest;
            }
            let gamma = frobenius_dot(gradient, &(gradient - &prev.gradient)) / denom;
            steepest + &prev.direction * gamma
        }
    }
}

/// Polak–Ribière direction, restarted as `−∇` unless `⟨∇, d⟩ < 0`.
pub fn descent_direction(gradient: &Array2<f64>, previous: Option<&ConjugateState>) -> Array2<f64> {
    let direction = polak_ribiere(gradient, previous);
    if previous.is_some() && frobenius_dot(gradient, &direction) >= 0.0 {
        tracing::trace!("conjugate direction is not a descent direction, restarting");
        return gradient.mapv(|g| -g);
    }
    direction
}

/// `direction / √(2·‖direction‖²_F)`; a zero direction is returned as is.
pub fn normalize_direction(direction: &Array2<f64>) -> Array2<f64> {
    let norm = (2.0 * frobenius_dot(direction, direction)).sqrt();
    if norm > 0.0 {
        direction / norm
    } else {
        direction.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::matrix::skew_inner;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Without history the direction is steepest descent.
    //
    // Given
    // -----
    // - A skew gradient and no previous state.
    //
    // Expect
    // ------
    // - direction = −gradient.
    fn first_direction_is_steepest_descent() {
        let g = array![[0.0, 2.0], [-2.0, 0.0]];

        let d = polak_ribiere(&g, None);

        assert_eq!(d, array![[0.0, -2.0], [2.0, 0.0]]);
    }

    #[test]
    // Purpose
    // -------
    // γ follows the Polak–Ribière formula.
    //
    // Given
    // -----
    // - Previous gradient [[0, 1], [−1, 0]] with direction [[0, −1], [1, 0]];
    //   current gradient [[0, 2], [−2, 0]].
    //
    // Expect
    // ------
    // - γ = ⟨g, g − gold⟩/⟨gold, gold⟩ = 4/2 = 2, so
    //   direction = −g + 2·dold = [[0, −4], [4, 0]].
    fn polak_ribiere_combines_previous_direction() {
        let prev = ConjugateState {
            gradient: array![[0.0, 1.0], [-1.0, 0.0]],
            direction: array![[0.0, -1.0], [1.0, 0.0]],
        };
        let g = array![[0.0, 2.0], [-2.0, 0.0]];

        let d = polak_ribiere(&g, Some(&prev));

        assert_eq!(d, array![[0.0, -4.0], [4.0, 0.0]]);
    }

    #[test]
    // Purpose
    // -------
    // After an overshoot the Polak–Ribière direction points uphill and is
    // replaced by steepest descent.
    //
    // Given
    // -----
    // - Previous gradient g₀ = [[0, 1], [−1, 0]], direction −g₀; current
    //   gradient −0.5·g₀ (the minimum was overshot).
    //
    // Expect
    // ------
    // - `polak_ribiere` is an ascent direction; `descent_direction` returns
    //   −∇ = 0.5·g₀.
    fn overshoot_restarts_with_steepest_descent() {
        let g0 = array![[0.0, 1.0], [-1.0, 0.0]];
        let prev = ConjugateState { gradient: g0.clone(), direction: g0.mapv(|v| -v) };
        let g = g0.mapv(|v| -0.5 * v);

        let pr = polak_ribiere(&g, Some(&prev));
        let d = descent_direction(&g, Some(&prev));

        assert!(frobenius_dot(&g, &pr) > 0.0);
        assert_eq!(d, g0.mapv(|v| 0.5 * v));
    }

    #[test]
    // Purpose
    // -------
    // In two dimensions every overshoot turns the plain Polak–Ribière
    // update uphill, while the restarted direction always descends.
    //
    // Given
    // -----
    // - J = [[0, 1], [−1, 0]] spans all 2x2 skew matrices.
    // - Previous gradient J, previous direction −J, current gradient a·J
    //   for several a, negative a meaning the minimum was overshot.
    //
    // Expect
    // ------
    // - `polak_ribiere` equals −a²·J, so ⟨g, d⟩ = −2a³ > 0 for every a < 0.
    // - `descent_direction` has ⟨g, d⟩ < 0 for every a ≠ 0 and keeps the
    //   Polak–Ribière direction when a > 0.
    fn two_dimensional_overshoot_needs_restart() {
        let j = array![[0.0, 1.0], [-1.0, 0.0]];
        let prev = ConjugateState { gradient: j.clone(), direction: j.mapv(|v| -v) };

        for a in [-2.0, -1.0, -0.3, -1e-3, 1e-3, 0.5, 1.5] {
            let g = j.mapv(|v| a * v);

            let pr = polak_ribiere(&g, Some(&prev));
            let d = descent_direction(&g, Some(&prev));

            assert_relative_eq!(frobenius_dot(&g, &pr), -2.0 * a * a * a, epsilon = 1e-12);
            if a < 0.0 {
                assert!(frobenius_dot(&g, &pr) > 0.0, "a = {a}");
            } else {
                assert_eq!(d, pr);
            }
            assert!(frobenius_dot(&g, &d) < 0.0, "a = {a}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Normalized directions satisfy `2·Σ s² = 1`, hence
    // `skew_inner(s, s) = 1/4`.
    //
    // Given
    // -----
    // - direction [[0, 3], [−3, 0]].
    //
    // Expect
    // ------
    // - `2·Σ s² = 1`; the zero direction is left unchanged.
    fn normalized_direction_has_unit_scaled_norm() {
        let d = array![[0.0, 3.0], [-3.0, 0.0]];

        let s = normalize_direction(&d);

        assert_relative_eq!(2.0 * frobenius_dot(&s, &s), 1.0, epsilon = 1e-12);
        assert_relative_eq!(skew_inner(&s, &s), 0.25, epsilon = 1e-12);
        assert_eq!(normalize_direction(&Array2::zeros((2, 2))), Array2::<f64>::zeros((2, 2)));
    }
}
