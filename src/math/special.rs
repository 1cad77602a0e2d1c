//! Digamma and trigamma functions
//!
//! Both use the recurrence `f(x) = f(x + 1) ± ...` to push the argument past
//! [`ASYMPTOTIC_THRESHOLD`], then the asymptotic series in `1/x`. With the
//! terms kept here the truncation error is below 1e-10 for every `x > 0`.

/// Arguments at or above this value go straight to the asymptotic series.
const ASYMPTOTIC_THRESHOLD: f64 = 6.0;

/// Digamma function ψ(x) = d/dx ln Γ(x), for x > 0.
pub fn digamma(x: f64) -> f64 {
    debug_assert!(x > 0.0, "digamma is only evaluated on positive arguments");

    let mut x = x;
    let mut result = 0.0;

    // ψ(x) = ψ(x + 1) - 1/x
    while x < ASYMPTOTIC_THRESHOLD {
        result -= 1.0 / x;
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    let series = inv2
        * (1.0 / 12.0
            - inv2
                * (1.0 / 120.0
                    - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 * (1.0 / 132.0)))));

    result + x.ln() - 0.5 * inv - series
}

/// Trigamma function ψ'(x) = d²/dx² ln Γ(x), for x > 0.
pub fn trigamma(x: f64) -> f64 {
    debug_assert!(x > 0.0, "trigamma is only evaluated on positive arguments");

    let mut x = x;
    let mut result = 0.0;

    // ψ'(x) = ψ'(x + 1) + 1/x²
    while x < ASYMPTOTIC_THRESHOLD {
        result += 1.0 / (x * x);
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    let series = inv
        + 0.5 * inv2
        + inv * inv2
            * (1.0 / 6.0
                - inv2
                    * (1.0 / 30.0
                        - inv2 * (1.0 / 42.0 - inv2 * (1.0 / 30.0 - inv2 * (5.0 / 66.0)))));

    result + series
}
