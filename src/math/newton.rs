//! Newton step for a diagonal-plus-rank-one Hessian

use ndarray::Array1;

/// Solve `(diag(h) + z·11ᵀ)·δ = g` in O(K) with the Sherman–Morrison identity.
///
/// `c = (Σ g_k/h_k) / (1/z + Σ 1/h_k)`, then `δ_k = (g_k − c) / h_k`.
/// Every `h_k` and `z` must be non-zero; the caller guarantees this through
/// trigamma being strictly positive on positive arguments.
pub fn solve_structured_newton_step(
    gradient: &Array1<f64>,
    hessian_diagonal: &Array1<f64>,
    off_diagonal: f64,
) -> Array1<f64> {
    debug_assert_eq!(gradient.len(), hessian_diagonal.len());

    let mut weighted_gradient = 0.0;
    let mut inverse_sum = 0.0;
    for (&g, &h) in gradient.iter().zip(hessian_diagonal.iter()) {
        weighted_gradient += g / h;
        inverse_sum += 1.0 / h;
    }
    let c = weighted_gradient / (1.0 / off_diagonal + inverse_sum);

    gradient
        .iter()
        .zip(hessian_diagonal.iter())
        .map(|(&g, &h)| (g - c) / h)
        .collect()
}
