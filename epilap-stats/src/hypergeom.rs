//! The hypergeometric distribution with exact, log-space tails.
//!
//! `X ~ Hypergeometric(N, K, n)` counts successes when drawing `n` items
//! without replacement from a population of `N` containing `K` successes.
//! Point masses are evaluated as `ln C(K,k) + ln C(N-K,n-k) - ln C(N,n)` so
//! universes of billions of base pairs never overflow, and tail sums are
//! accumulated in log space.

use epilap_core::{EpilapError, Result};

use crate::combinatorics::{ln_choose, ln_factorial};
use crate::distribution::ln_sum_exp;

/// Relative tolerance under which two table probabilities count as tied.
///
/// At base-pair populations the rounding error of `ln_pmf` exceeds this
/// (`ln N!` is about 6e10 at N = 3e9), so the tolerance actually used is
/// widened to that error; see [`Hypergeometric::two_sided`].
pub const RELATIVE_TIE: f64 = 1e-7;

/// Rounding error of `ln_pmf`, in units of `EPSILON * ln N!`. Six `ln Γ`
/// terms of at most that size enter every log point mass.
const TIE_ROUNDING_ULPS: f64 = 8.0;

/// Once the bound on all remaining tail mass falls this far (in log units)
/// below the largest term, summation stops.
const TAIL_CUTOFF: f64 = -40.0;

/// Hypergeometric distribution over `[max(0, n+K-N), min(n, K)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypergeometric {
    population: u64,
    successes: u64,
    draws: u64,
}

impl Hypergeometric {
    /// `population` = N, `successes` = K, `draws` = n.
    ///
    /// # Errors
    ///
    /// Fails when `K > N` or `n > N`.
    pub fn new(population: u64, successes: u64, draws: u64) -> Result<Self> {
        if successes > population {
            return Err(EpilapError::validation(format!(
                "invalid table: successes K={successes} exceed population N={population}"
            )));
        }
        if draws > population {
            return Err(EpilapError::validation(format!(
                "invalid table: draws n={draws} exceed population N={population}"
            )));
        }
        Ok(Self {
            population,
            successes,
            draws,
        })
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Smallest and largest attainable `k`.
    pub fn support(&self) -> (u64, u64) {
        let lo = self
            .draws
            .saturating_add(self.successes)
            .saturating_sub(self.population);
        (lo, self.draws.min(self.successes))
    }

    /// Most probable `k`: `floor((n+1)(K+1)/(N+2))`.
    pub fn mode(&self) -> u64 {
        let (lo, hi) = self.support();
        let num = (self.draws as u128 + 1) * (self.successes as u128 + 1);
        let m = (num / (self.population as u128 + 2)) as u64;
        m.clamp(lo, hi)
    }

    /// Expected value `nK/N`.
    pub fn mean(&self) -> f64 {
        if self.population == 0 {
            return 0.0;
        }
        self.draws as f64 * self.successes as f64 / self.population as f64
    }

    /// `ln P(X = k)`, `-inf` outside the support.
    pub fn ln_pmf(&self, k: u64) -> f64 {
        let (lo, hi) = self.support();
        if k < lo || k > hi {
            return f64::NEG_INFINITY;
        }
        ln_choose(self.successes, k) + ln_choose(self.population - self.successes, self.draws - k)
            - ln_choose(self.population, self.draws)
    }

    /// `P(X = k)`.
    pub fn pmf(&self, k: u64) -> f64 {
        self.ln_pmf(k).exp()
    }

    fn check(&self, k: u64) -> Result<()> {
        if k > self.draws.min(self.successes) {
            return Err(EpilapError::validation(format!(
                "invalid table: k={k} exceeds min(n={}, K={})",
                self.draws, self.successes
            )));
        }
        if self.draws - k > self.population - self.successes {
            return Err(EpilapError::validation(format!(
                "invalid table: n-k={} exceeds N-K={}",
                self.draws - k,
                self.population - self.successes
            )));
        }
        Ok(())
    }

    /// `ln P(X >= from)` for `from` inside the support.
    ///
    /// Past the mode the point masses decrease with non-increasing ratios
    /// (the pmf is log-concave), so the rest of the tail is bounded by a
    /// geometric series and summation stops once that bound is negligible.
    fn ln_upper(&self, from: u64) -> f64 {
        let (_, hi) = self.support();
        let mode = self.mode();
        let mut terms = Vec::new();
        let mut ln_max = f64::NEG_INFINITY;
        let mut prev: Option<f64> = None;

        for j in from..=hi {
            let t = self.ln_pmf(j);
            terms.push(t);
            ln_max = ln_max.max(t);
            if let (true, Some(p)) = (j > mode, prev) {
                let ln_ratio = t - p;
                if ln_ratio < 0.0 {
                    let ln_rest = t + ln_ratio - (-ln_ratio.exp()).ln_1p();
                    if ln_rest < ln_max + TAIL_CUTOFF {
                        break;
                    }
                }
            }
            prev = Some(t);
        }
        ln_sum_exp(&terms)
    }

    /// The same experiment counting failures: `n - X`.
    fn mirrored(&self) -> Self {
        Self {
            population: self.population,
            successes: self.population - self.successes,
            draws: self.draws,
        }
    }

    /// Upper tail `P(X >= k)`.
    ///
    /// Returns exactly 1 for `k = 0`, and the exact point mass for
    /// `k = min(n, K)`.
    ///
    /// # Errors
    ///
    /// Fails when `k > min(n, K)` or `n - k > N - K`.
    pub fn upper_tail(&self, k: u64) -> Result<f64> {
        self.check(k)?;
        let (lo, _) = self.support();
        if k <= lo {
            return Ok(1.0);
        }
        probability(self.ln_upper(k).exp(), "upper tail")
    }

    /// Lower tail `P(X <= k)`.
    pub fn lower_tail(&self, k: u64) -> Result<f64> {
        self.check(k)?;
        let (_, hi) = self.support();
        if k >= hi {
            return Ok(1.0);
        }
        probability(self.mirrored().ln_upper(self.draws - k).exp(), "lower tail")
    }

    /// Two-sided p-value: total probability of every `j` with
    /// `P(X = j) <= P(X = k)`, ties within [`RELATIVE_TIE`] included.
    ///
    /// When `N` is large enough for the rounding error of the log point
    /// masses to exceed [`RELATIVE_TIE`], ties are resolved at that error
    /// instead: two masses closer than the arithmetic can tell apart tie.
    ///
    /// The pmf is unimodal, so the qualifying values form the two tails.
    /// The tail on `k`'s side is walked outward from `k`, the boundary on the
    /// far side is found by binary search.
    pub fn two_sided(&self, k: u64) -> Result<f64> {
        self.check(k)?;
        let (lo, hi) = self.support();
        let mode = self.mode();
        let ln_threshold = self.ln_pmf(k) + self.ln_tie_tolerance();
        if self.ln_pmf(mode) <= ln_threshold {
            return Ok(1.0);
        }

        let p = if k < mode {
            let mut edge = k;
            while edge + 1 < mode && self.ln_pmf(edge + 1) <= ln_threshold {
                edge += 1;
            }
            let left = self.lower_tail(edge)?;
            // pmf is non-increasing on (mode, hi]
            let first = partition_point(mode + 1, hi + 1, |j| self.ln_pmf(j) > ln_threshold);
            let right = if first <= hi { self.upper_tail(first)? } else { 0.0 };
            left + right
        } else {
            let mut edge = k;
            while edge - 1 > mode && self.ln_pmf(edge - 1) <= ln_threshold {
                edge -= 1;
            }
            let right = self.upper_tail(edge)?;
            // pmf is non-decreasing on [lo, mode)
            let past = partition_point(lo, mode, |j| self.ln_pmf(j) <= ln_threshold);
            let left = if past > lo { self.lower_tail(past - 1)? } else { 0.0 };
            left + right
        };
        probability(p, "two-sided tail")
    }

    fn ln_tie_tolerance(&self) -> f64 {
        let rounding = TIE_ROUNDING_ULPS * f64::EPSILON * ln_factorial(self.population);
        RELATIVE_TIE.ln_1p().max(rounding)
    }
}

/// First `j` in `[lo, hi)` for which `pred` is false; `pred` must be true on
/// a prefix of the range and false on the rest.
fn partition_point(mut lo: u64, mut hi: u64, pred: impl Fn(u64) -> bool) -> u64 {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn probability(p: f64, what: &str) -> Result<f64> {
    if !p.is_finite() {
        return Err(EpilapError::Numeric(format!("{what} evaluated to {p}")));
    }
    Ok(p.clamp(0.0, 1.0))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_dist() -> impl Strategy<Value = Hypergeometric> {
        (1u64..400)
            .prop_flat_map(|n_pop| (Just(n_pop), 0..=n_pop, 0..=n_pop))
            .prop_map(|(n_pop, succ, draws)| Hypergeometric::new(n_pop, succ, draws).unwrap())
    }

    proptest! {
        #[test]
        fn upper_tail_is_probability_and_monotone(h in arb_dist()) {
            let (lo, hi) = h.support();
            let mut prev = 1.0;
            for k in lo..=hi {
                let p = h.upper_tail(k).unwrap();
                prop_assert!((0.0..=1.0).contains(&p));
                prop_assert!(p <= prev + 1e-12);
                prev = p;
            }
        }

        #[test]
        fn two_sided_at_least_point_mass(h in arb_dist()) {
            let (lo, hi) = h.support();
            for k in lo..=hi {
                let p = h.two_sided(k).unwrap();
                prop_assert!((0.0..=1.0).contains(&p));
                prop_assert!(p + 1e-12 >= h.pmf(k));
            }
        }
    }
}
