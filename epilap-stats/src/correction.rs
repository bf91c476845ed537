//! Multiple testing correction.
//!
//! When running many hypothesis tests simultaneously, p-values must be
//! adjusted to control the family-wise error rate or false discovery rate.
//! Every method returns adjusted values in input order, each at least its raw
//! value and at most 1.

use std::fmt;
use std::str::FromStr;

use epilap_core::{EpilapError, Result};

/// Multiple testing correction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CorrectionMethod {
    /// Raw p-values are reported as adjusted.
    None,
    /// Bonferroni correction: controls family-wise error rate (FWER).
    Bonferroni,
    /// Holm step-down: controls FWER, uniformly more powerful than Bonferroni.
    Holm,
    /// Šidák correction: FWER under independence.
    Sidak,
    /// Benjamini-Hochberg procedure: controls false discovery rate (FDR).
    #[default]
    BenjaminiHochberg,
    /// Benjamini-Yekutieli: FDR under arbitrary dependence.
    BenjaminiYekutieli,
}

impl FromStr for CorrectionMethod {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CorrectionMethod::None),
            "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            "holm" => Ok(CorrectionMethod::Holm),
            "sidak" => Ok(CorrectionMethod::Sidak),
            "bh" | "fdr_bh" | "benjamini_hochberg" => Ok(CorrectionMethod::BenjaminiHochberg),
            "by" | "fdr_by" | "benjamini_yekutieli" => Ok(CorrectionMethod::BenjaminiYekutieli),
            _ => Err(EpilapError::validation(format!(
                "unknown correction method '{s}'"
            ))),
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CorrectionMethod::None => "none",
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::Sidak => "sidak",
            CorrectionMethod::BenjaminiHochberg => "bh",
            CorrectionMethod::BenjaminiYekutieli => "by",
        })
    }
}

/// Apply a multiple testing correction to `p_values`.
///
/// Returns a new `Vec<f64>` of adjusted p-values in the same order as the
/// input.
pub fn correct(p_values: &[f64], method: CorrectionMethod) -> Result<Vec<f64>> {
    match method {
        CorrectionMethod::None => {
            validate_p_values(p_values)?;
            Ok(p_values.to_vec())
        }
        CorrectionMethod::Bonferroni => bonferroni(p_values),
        CorrectionMethod::Holm => holm(p_values),
        CorrectionMethod::Sidak => sidak(p_values),
        CorrectionMethod::BenjaminiHochberg => benjamini_hochberg(p_values),
        CorrectionMethod::BenjaminiYekutieli => benjamini_yekutieli(p_values),
    }
}

/// Bonferroni correction: `p_adj = min(p * n, 1.0)`.
pub fn bonferroni(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;
    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Šidák correction: `p_adj = 1 - (1 - p)^n`.
pub fn sidak(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;
    // 1 - (1-p)^n = -expm1(n * ln(1-p)), accurate for tiny p
    Ok(p_values
        .iter()
        .map(|&p| (-(n * (-p).ln_1p()).exp_m1()).clamp(p, 1.0))
        .collect())
}

/// Holm step-down: sorted ascending, `p_(i) * (n - i)` made monotone from
/// the smallest p-value upward.
pub fn holm(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    let indices = ascending_order(p_values);

    let mut adjusted = vec![0.0; n];
    let mut running = 0.0_f64;
    for (i, &idx) in indices.iter().enumerate() {
        let adj = (p_values[idx] * (n - i) as f64).min(1.0);
        running = running.max(adj);
        adjusted[idx] = running;
    }
    Ok(adjusted)
}

/// Benjamini-Hochberg procedure for controlling the false discovery rate.
///
/// Sorts p-values, adjusts as `p * n / rank`, enforces monotonicity
/// from right to left, and clamps to [0, 1].
pub fn benjamini_hochberg(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    Ok(step_up(p_values, 1.0))
}

/// Benjamini-Yekutieli: Benjamini-Hochberg scaled by `Σ_{i=1..n} 1/i`.
pub fn benjamini_yekutieli(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let harmonic: f64 = (1..=p_values.len()).map(|i| 1.0 / i as f64).sum();
    Ok(step_up(p_values, harmonic))
}

fn step_up(p_values: &[f64], scale: f64) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return Vec::new();
    }
    let indices = ascending_order(p_values);

    let n_f = n as f64;
    let mut adjusted = vec![0.0; n];

    // Compute adjusted p-values and enforce monotonicity (right to left).
    let mut prev = f64::INFINITY;
    for i in (0..n).rev() {
        let rank = (i + 1) as f64;
        let adj = (p_values[indices[i]] * scale * n_f / rank).min(1.0);
        let adj = adj.min(prev);
        adjusted[indices[i]] = adj;
        prev = adj;
    }

    adjusted
}

/// Indices sorted by p-value; ties keep input order.
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..p_values.len()).collect();
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    indices
}

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(EpilapError::validation(format!(
                "p-value at index {} is out of range [0, 1]: {}",
                i, p,
            )));
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn bonferroni_basic() {
        let p = [0.001, 0.02, 0.03, 0.5];
        let adj = bonferroni(&p).unwrap();
        let expected = [0.004, 0.08, 0.12, 1.0];
        for (a, e) in adj.iter().zip(expected) {
            assert!((a - e).abs() < TOL, "{a} vs {e}");
        }
    }

    #[test]
    fn bonferroni_clamp() {
        let p = [0.5, 0.8];
        let adj = bonferroni(&p).unwrap();
        assert!((adj[0] - 1.0).abs() < TOL);
        assert!((adj[1] - 1.0).abs() < TOL);
    }

    #[test]
    fn bh_known() {
        // Classic BH example
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = benjamini_hochberg(&p).unwrap();
        // Sorted: 0.005(idx3), 0.01(idx0), 0.03(idx2), 0.04(idx1)
        // Ranks:    1            2            3            4
        // Raw adj: 0.005*4/1=0.02, 0.01*4/2=0.02, 0.03*4/3=0.04, 0.04*4/4=0.04
        // Monotonicity (R-to-L): 0.04, 0.04, 0.02, 0.02
        assert!((adj[3] - 0.02).abs() < TOL);
        assert!((adj[0] - 0.02).abs() < TOL);
        assert!((adj[2] - 0.04).abs() < TOL);
        assert!((adj[1] - 0.04).abs() < TOL);
    }

    #[test]
    fn bh_monotonicity() {
        let p = [0.001, 0.02, 0.03, 0.5];
        let adj = benjamini_hochberg(&p).unwrap();
        for w in adj.windows(2) {
            assert!(w[1] >= w[0] - TOL, "monotonicity violated: {} > {}", w[0], w[1]);
        }
        // 0.001*4, 0.02*2, 0.03*4/3, 0.5
        assert!((adj[0] - 0.004).abs() < TOL);
        assert!((adj[1] - 0.04).abs() < TOL);
        assert!((adj[2] - 0.04).abs() < TOL);
        assert!((adj[3] - 0.5).abs() < TOL);
    }

    #[test]
    fn by_scales_bh() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let bh = benjamini_hochberg(&p).unwrap();
        let by = benjamini_yekutieli(&p).unwrap();
        let c = 1.0 + 0.5 + 1.0 / 3.0 + 0.25;
        for (x, y) in bh.iter().zip(&by) {
            assert!((x * c - y).abs() < TOL);
        }
    }

    #[test]
    fn holm_known() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let adj = holm(&p).unwrap();
        // Sorted: 0.005*4=0.02, 0.01*3=0.03, 0.03*2=0.06, 0.04*1=0.04 -> 0.06
        assert!((adj[3] - 0.02).abs() < TOL);
        assert!((adj[0] - 0.03).abs() < TOL);
        assert!((adj[2] - 0.06).abs() < TOL);
        assert!((adj[1] - 0.06).abs() < TOL);
    }

    #[test]
    fn sidak_known() {
        let adj = sidak(&[0.05, 0.5]).unwrap();
        assert!((adj[0] - (1.0 - 0.95_f64.powi(2))).abs() < TOL);
        assert!((adj[1] - 0.75).abs() < TOL);
        // Tiny p-values keep full precision.
        let tiny = sidak(&[1e-300, 0.5]).unwrap();
        assert!(tiny[0] > 0.0);
    }

    #[test]
    fn none_is_identity() {
        let p = [0.3, 0.01];
        assert_eq!(correct(&p, CorrectionMethod::None).unwrap(), p.to_vec());
    }

    #[test]
    fn correction_empty() {
        for method in [
            CorrectionMethod::None,
            CorrectionMethod::Bonferroni,
            CorrectionMethod::Holm,
            CorrectionMethod::Sidak,
            CorrectionMethod::BenjaminiHochberg,
            CorrectionMethod::BenjaminiYekutieli,
        ] {
            assert_eq!(correct(&[], method).unwrap(), Vec::<f64>::new());
        }
    }

    #[test]
    fn correction_single() {
        assert!((bonferroni(&[0.05]).unwrap()[0] - 0.05).abs() < TOL);
        assert!((benjamini_hochberg(&[0.05]).unwrap()[0] - 0.05).abs() < TOL);
        assert!((holm(&[0.05]).unwrap()[0] - 0.05).abs() < TOL);
    }

    #[test]
    fn correction_invalid_p() {
        assert!(bonferroni(&[0.5, 1.5]).is_err());
        assert!(benjamini_hochberg(&[-0.1, 0.5]).is_err());
        assert!(correct(&[f64::NAN], CorrectionMethod::None).is_err());
        assert!(holm(&[f64::NAN]).is_err());
    }

    #[test]
    fn parse_methods() {
        assert_eq!("fdr_bh".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::BenjaminiHochberg);
        assert_eq!("fdr_by".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::BenjaminiYekutieli);
        assert_eq!("Bonferroni".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::Bonferroni);
        assert_eq!("bh".parse::<CorrectionMethod>().unwrap().to_string(), "bh");
        assert!("fdr_tsbh".parse::<CorrectionMethod>().is_err());
    }
}
