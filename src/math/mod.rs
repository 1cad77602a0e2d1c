//! Numerical building blocks for variational EM
//!
//! - Simplex normalization with an explicit all-zero policy
//! - Digamma and trigamma
//! - The O(K) Newton solve for the concentration update

pub mod newton;
pub mod special;

pub use newton::solve_structured_newton_step;
pub use special::{digamma, trigamma};

use crate::error::{LdaError, Result};
use ndarray::{Array1, ArrayView1};

/// Scale `v` so that its entries sum to one.
///
/// Fails with [`LdaError::DivideByZero`] when the sum is zero, negative or not
/// finite, so a degenerate input never turns into NaN entries.
pub fn normalize(v: ArrayView1<f64>) -> Result<Array1<f64>> {
    let sum = v.sum();
    if !(sum > 0.0) || !sum.is_finite() {
        return Err(LdaError::DivideByZero(sum));
    }
    Ok(v.mapv(|x| x / sum))
}

/// Like [`normalize`], but an input with no mass becomes the uniform
/// distribution. The returned flag is `true` when the fallback was taken.
pub fn normalize_or_uniform(v: ArrayView1<f64>) -> (Array1<f64>, bool) {
    match normalize(v) {
        Ok(normalized) => (normalized, false),
        Err(_) => {
            let n = v.len().max(1) as f64;
            (Array1::from_elem(v.len(), 1.0 / n), true)
        }
    }
}

/// Normalize `exp(log_scores)` without overflow or underflow of the largest
/// term. Entries equal to `-inf` get probability zero.
pub fn normalize_log_scores(log_scores: ArrayView1<f64>) -> (Array1<f64>, bool) {
    let max = log_scores
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return normalize_or_uniform(Array1::zeros(log_scores.len()).view());
    }
    let shifted = log_scores.mapv(|s| (s - max).exp());
    normalize_or_uniform(shifted.view())
}
