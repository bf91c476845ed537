//! Exact hypothesis tests on counts.
//!
//! Provides the one-sided hypergeometric enrichment test
//! ([`hypergeometric_test`]) and Fisher's exact test on a 2×2
//! [`ContingencyTable`] ([`fisher_exact`]) under a chosen [`Alternative`].

use std::fmt;
use std::str::FromStr;

use epilap_core::{EpilapError, Result, Summarizable};

use crate::hypergeom::Hypergeometric;

/// Result of a hypothesis test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestResult {
    /// Probability of the observed table under the null.
    pub statistic: f64,
    /// p-value under the requested alternative.
    pub p_value: f64,
    /// Name of the test method.
    pub method: String,
}

impl Summarizable for TestResult {
    fn summary(&self) -> String {
        format!(
            "{}: statistic={:.4e}, p={:.6e}",
            self.method, self.statistic, self.p_value,
        )
    }
}

/// Alternative hypothesis of a Fisher's exact test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alternative {
    #[default]
    TwoSided,
    /// Odds ratio greater than 1 (enrichment).
    Greater,
    /// Odds ratio less than 1 (depletion).
    Less,
}

impl FromStr for Alternative {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "two-sided" | "two_sided" | "two.sided" => Ok(Alternative::TwoSided),
            "greater" => Ok(Alternative::Greater),
            "less" => Ok(Alternative::Less),
            _ => Err(EpilapError::validation(format!(
                "alternative must be one of two-sided, greater, less; got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Greater => "greater",
            Alternative::Less => "less",
        })
    }
}

/// A 2×2 table of counts.
///
/// ```text
///                 in category   not in category
/// foreground           a               b
/// rest                 c               d
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// `a + b`.
    pub fn row1(&self) -> u64 {
        self.a + self.b
    }

    /// `a + c`.
    pub fn col1(&self) -> u64 {
        self.a + self.c
    }

    /// Swap the two rows.
    pub fn swap_rows(&self) -> Self {
        Self::new(self.c, self.d, self.a, self.b)
    }

    pub fn transpose(&self) -> Self {
        Self::new(self.a, self.c, self.b, self.d)
    }

    /// Odds ratio with 0.5 added to every cell (Haldane–Anscombe), finite
    /// even when a cell is zero.
    pub fn odds_ratio(&self) -> f64 {
        let [a, b, c, d] = [self.a, self.b, self.c, self.d].map(|x| x as f64 + 0.5);
        (a * d) / (b * c)
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}, {}], [{}, {}]]", self.a, self.b, self.c, self.d)
    }
}

/// Fisher's exact test on a 2×2 contingency table.
///
/// Under the null, `a` follows a hypergeometric distribution with
/// population `a+b+c+d`, `a+c` successes and `a+b` draws. `Greater` is the
/// upper tail, `Less` the lower tail, and `TwoSided` sums every table at most
/// as probable as the observed one (see [`Hypergeometric::two_sided`]).
pub fn fisher_exact(table: &ContingencyTable, alternative: Alternative) -> Result<TestResult> {
    let n = table.total();
    if n == 0 {
        return Err(EpilapError::validation("fisher_exact: table is all zeros"));
    }

    let dist = Hypergeometric::new(n, table.col1(), table.row1())?;
    let p_value = match alternative {
        Alternative::Greater => dist.upper_tail(table.a)?,
        Alternative::Less => dist.lower_tail(table.a)?,
        Alternative::TwoSided => dist.two_sided(table.a)?,
    };

    Ok(TestResult {
        statistic: dist.pmf(table.a),
        p_value,
        method: format!("Fisher's exact test ({alternative})"),
    })
}

/// One-sided hypergeometric enrichment test `P(X >= k)`.
///
/// `population` = N, `successes` = K, `draws` = n, `observed` = k. Margins
/// that no table can satisfy are rejected before any computation.
pub fn hypergeometric_test(
    population: u64,
    successes: u64,
    draws: u64,
    observed: u64,
) -> Result<TestResult> {
    let dist = Hypergeometric::new(population, successes, draws)?;
    let p_value = dist.upper_tail(observed)?;
    Ok(TestResult {
        statistic: dist.pmf(observed),
        p_value,
        method: "Hypergeometric test".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn fisher_greater_exact_value() {
        // P(a >= 8) = (C(11,8)C(9,2) + C(11,9)C(9,1) + C(11,10)C(9,0)) / C(20,10)
        let table = ContingencyTable::new(8, 2, 3, 7);
        let r = fisher_exact(&table, Alternative::Greater).unwrap();
        let expected = (165.0 * 36.0 + 55.0 * 9.0 + 11.0) / 184_756.0;
        assert!((r.p_value - expected).abs() < TOL, "{} vs {}", r.p_value, expected);

        let again = fisher_exact(&table, Alternative::Greater).unwrap();
        assert_eq!(r.p_value.to_bits(), again.p_value.to_bits());
    }

    #[test]
    fn fisher_statistic_is_observed_probability() {
        let table = ContingencyTable::new(8, 2, 3, 7);
        let r = fisher_exact(&table, Alternative::TwoSided).unwrap();
        assert!((r.statistic - 5940.0 / 184_756.0).abs() < TOL);
        assert!(r.p_value >= r.statistic);
    }

    #[test]
    fn fisher_less_and_greater_cover_everything() {
        let table = ContingencyTable::new(3, 7, 8, 2);
        let less = fisher_exact(&table, Alternative::Less).unwrap().p_value;
        let greater = fisher_exact(&table, Alternative::Greater).unwrap().p_value;
        let point = fisher_exact(&table, Alternative::Less).unwrap().statistic;
        assert!((less + greater - 1.0 - point).abs() < 1e-10);
    }

    #[test]
    fn fisher_two_sided_symmetry() {
        let table = ContingencyTable::new(8, 2, 3, 7);
        let p = fisher_exact(&table, Alternative::TwoSided).unwrap().p_value;
        let swapped = fisher_exact(&table.swap_rows(), Alternative::TwoSided).unwrap().p_value;
        let transposed = fisher_exact(&table.transpose(), Alternative::TwoSided).unwrap().p_value;
        assert!((p - swapped).abs() < 1e-10);
        assert!((p - transposed).abs() < 1e-10);
    }

    #[test]
    fn fisher_symmetric_table_is_one() {
        let table = ContingencyTable::new(5, 5, 5, 5);
        let r = fisher_exact(&table, Alternative::TwoSided).unwrap();
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn fisher_all_zero_rejected() {
        let table = ContingencyTable::new(0, 0, 0, 0);
        assert!(fisher_exact(&table, Alternative::TwoSided).is_err());
    }

    #[test]
    fn fisher_zero_cells_are_fine() {
        let table = ContingencyTable::new(0, 10, 10, 0);
        let r = fisher_exact(&table, Alternative::Less).unwrap();
        assert!(r.p_value > 0.0 && r.p_value < 1e-4);
        assert!(table.odds_ratio().is_finite());
    }

    #[test]
    fn haldane_odds_ratio() {
        let table = ContingencyTable::new(8, 2, 3, 7);
        let expected = (8.5 * 7.5) / (2.5 * 3.5);
        assert!((table.odds_ratio() - expected).abs() < TOL);
    }

    #[test]
    fn hypergeometric_test_values() {
        let r = hypergeometric_test(1000, 100, 10, 0).unwrap();
        assert_eq!(r.p_value, 1.0);
        assert!(hypergeometric_test(1000, 100, 10, 11).is_err());
        assert!(hypergeometric_test(100, 1000, 10, 1).is_err());
        let r = hypergeometric_test(1000, 100, 10, 5).unwrap();
        assert!((r.p_value - 0.0015214219087734105).abs() < 1e-12, "{}", r.p_value);
    }

    #[test]
    fn alternative_parse_and_display() {
        for alt in [Alternative::TwoSided, Alternative::Greater, Alternative::Less] {
            assert_eq!(alt.to_string().parse::<Alternative>().unwrap(), alt);
        }
        assert_eq!("two_sided".parse::<Alternative>().unwrap(), Alternative::TwoSided);
        assert!("both".parse::<Alternative>().is_err());
    }

    #[test]
    fn summary_format() {
        let r = fisher_exact(&ContingencyTable::new(8, 2, 3, 7), Alternative::Greater).unwrap();
        assert!(r.summary().starts_with("Fisher's exact test (greater):"));
    }
}
