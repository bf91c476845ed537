//! Log-space binomial coefficients.
//!
//! Hypergeometric point masses are ratios of binomial coefficients whose
//! exact values overflow long before genome-scale populations, so they are
//! only ever evaluated as logarithms.

use crate::distribution::ln_gamma;
use epilap_core::{EpilapError, Result};

/// `ln(n!)` via `ln(Γ(n + 1))`.
pub fn ln_factorial(n: u64) -> f64 {
    ln_gamma(n as f64 + 1.0)
}

/// `ln(C(n, k))`.
///
/// # Errors
///
/// Returns a validation error if `k > n`.
pub fn ln_binomial(n: u64, k: u64) -> Result<f64> {
    if k > n {
        return Err(EpilapError::validation(format!(
            "ln_binomial: k ({k}) must be <= n ({n})"
        )));
    }
    Ok(ln_choose(n, k))
}

/// `ln(C(n, k))`, `-inf` when `k > n`. The edges `k = 0` and `k = n` are
/// exactly 0.
pub(crate) fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    // symmetric; the smaller side keeps the three gamma terms closer in scale
    let k = k.min(n - k);
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-8;

    fn choose_exact(n: u64, k: u64) -> f64 {
        (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
    }

    #[test]
    fn ln_factorial_small() {
        let mut fact = 1.0_f64;
        for n in 1..=20u64 {
            fact *= n as f64;
            assert!((ln_factorial(n) - fact.ln()).abs() < TOL, "{n}!");
        }
        assert!(ln_factorial(0).abs() < 1e-10);
    }

    #[test]
    fn ln_binomial_accuracy() {
        for (n, k) in [(10, 3), (20, 10), (60, 30), (100, 97)] {
            let exact = choose_exact(n, k);
            let ln_val = ln_binomial(n, k).unwrap();
            assert!((ln_val - exact.ln()).abs() < TOL, "C({n},{k})");
        }
    }

    #[test]
    fn ln_binomial_invalid() {
        assert!(matches!(ln_binomial(3, 5), Err(EpilapError::Validation(_))));
        assert_eq!(ln_choose(3, 5), f64::NEG_INFINITY);
    }

    #[test]
    fn ln_choose_edges_are_exact() {
        assert_eq!(ln_choose(1_000_000, 0), 0.0);
        assert_eq!(ln_choose(1_000_000, 1_000_000), 0.0);
        assert_eq!(ln_choose(1_000_000, 3), ln_choose(1_000_000, 999_997));
    }
}
