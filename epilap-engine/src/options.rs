//! Analysis options and their string configuration form.
//!
//! [`AnalysisOptions`] can be filled in directly or parsed from a
//! [`ConfigMap`] of string keys and values as handed over by the calling
//! layer. Unknown keys and unparsable values are rejected.

use std::collections::BTreeMap;
use std::str::FromStr;

use epilap_core::{EpilapError, Result};
use epilap_omics::{OverlapCriteria, SizeMode, StrandMode};
use epilap_stats::{Alternative, CorrectionMethod};

use crate::context::StudyKind;

/// String options as received with a request.
pub type ConfigMap = BTreeMap<String, String>;

/// Largest window (bp) a foreground interval may be widened by in GSEA.
pub const MAX_DISTANCE: u64 = 5_000;

/// Every key [`AnalysisOptions::from_config`] accepts.
pub const KNOWN_KEYS: [&str; 11] = [
    "reference_genome",
    "strand_constraint",
    "min_overlap_threshold",
    "alternative",
    "correction_method",
    "significance_level",
    "size_unit",
    "max_distance",
    "collections",
    "study_kinds",
    "min_study_overlap",
];

/// Options controlling overlap rules, tests and correction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisOptions {
    /// Genome build the request was prepared for; must match the context.
    pub reference_genome: Option<String>,
    pub strand_constraint: StrandMode,
    /// Minimum `overlap_bp / shorter_len`; `None` accepts any overlap.
    pub min_overlap_threshold: Option<f64>,
    /// Alternative hypothesis of the LOA Fisher test.
    pub alternative: Alternative,
    pub correction_method: CorrectionMethod,
    /// Threshold on adjusted p-values (and on SOA record p-values).
    pub significance_level: f64,
    /// Unit LOA counts in.
    pub size_unit: SizeMode,
    /// Window (bp) by which GSEA foreground intervals are widened.
    pub max_distance: u64,
    /// Gene-set / feature-track collections to test; empty means all.
    pub collections: Vec<String>,
    /// Study kinds compared by SOA; empty means all.
    pub study_kinds: Vec<StudyKind>,
    /// Overlapping records a study needs to be reported significant.
    pub min_study_overlap: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            reference_genome: None,
            strand_constraint: StrandMode::Ignore,
            min_overlap_threshold: None,
            alternative: Alternative::TwoSided,
            correction_method: CorrectionMethod::BenjaminiHochberg,
            significance_level: 0.05,
            size_unit: SizeMode::IntervalCount,
            max_distance: 0,
            collections: Vec::new(),
            study_kinds: Vec::new(),
            min_study_overlap: 1,
        }
    }
}

impl AnalysisOptions {
    /// Parse options from string key/value pairs, starting from the defaults.
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let mut options = Self::default();
        for (key, value) in config {
            let value = value.trim();
            match key.as_str() {
                "reference_genome" => options.reference_genome = Some(value.to_string()),
                "strand_constraint" => options.strand_constraint = value.parse()?,
                "min_overlap_threshold" => {
                    options.min_overlap_threshold = Some(parse_number(key, value)?)
                }
                "alternative" => options.alternative = value.parse()?,
                "correction_method" => options.correction_method = value.parse()?,
                "significance_level" => options.significance_level = parse_number(key, value)?,
                "size_unit" => options.size_unit = value.parse()?,
                "max_distance" => options.max_distance = parse_number(key, value)?,
                "collections" => options.collections = split_list(value),
                "study_kinds" => {
                    options.study_kinds = split_list(value)
                        .iter()
                        .map(|k| k.parse())
                        .collect::<Result<_>>()?
                }
                "min_study_overlap" => options.min_study_overlap = parse_number(key, value)?,
                _ => {
                    return Err(EpilapError::validation(format!(
                        "unknown option '{key}' (expected one of: {})",
                        KNOWN_KEYS.join(", ")
                    )))
                }
            }
        }
        options.validate()?;
        Ok(options)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.criteria()?;
        if !(0.0..=1.0).contains(&self.significance_level) {
            return Err(EpilapError::validation(format!(
                "significance_level must be in [0, 1], got {}",
                self.significance_level
            )));
        }
        if self.max_distance > MAX_DISTANCE {
            return Err(EpilapError::validation(format!(
                "max_distance must be at most {MAX_DISTANCE}, got {}",
                self.max_distance
            )));
        }
        Ok(())
    }

    /// Overlap rules implied by `strand_constraint` and
    /// `min_overlap_threshold`.
    pub fn criteria(&self) -> Result<OverlapCriteria> {
        let criteria = OverlapCriteria::new(self.strand_constraint);
        match self.min_overlap_threshold {
            Some(t) => criteria.with_min_fraction(t),
            None => Ok(criteria),
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| EpilapError::validation(format!("option '{key}': cannot parse '{value}'")))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let o = AnalysisOptions::from_config(&ConfigMap::new()).unwrap();
        assert_eq!(o, AnalysisOptions::default());
        assert_eq!(o.alternative, Alternative::TwoSided);
        assert_eq!(o.correction_method, CorrectionMethod::BenjaminiHochberg);
        assert_eq!(o.min_study_overlap, 1);
    }

    #[test]
    fn parse_all_keys() {
        let o = AnalysisOptions::from_config(&config(&[
            ("reference_genome", "GRCh38"),
            ("strand_constraint", "opposite"),
            ("min_overlap_threshold", "0.25"),
            ("alternative", "greater"),
            ("correction_method", "fdr_by"),
            ("significance_level", "0.01"),
            ("size_unit", "base_pairs"),
            ("max_distance", "5000"),
            ("collections", "H, C2"),
            ("study_kinds", "association,profiling"),
            ("min_study_overlap", "3"),
        ]))
        .unwrap();
        assert_eq!(o.reference_genome.as_deref(), Some("GRCh38"));
        assert_eq!(o.strand_constraint, StrandMode::Opposite);
        assert_eq!(o.min_overlap_threshold, Some(0.25));
        assert_eq!(o.alternative, Alternative::Greater);
        assert_eq!(o.correction_method, CorrectionMethod::BenjaminiYekutieli);
        assert_eq!(o.significance_level, 0.01);
        assert_eq!(o.size_unit, SizeMode::BasePairs);
        assert_eq!(o.max_distance, 5000);
        assert_eq!(o.collections, vec!["H".to_string(), "C2".to_string()]);
        assert_eq!(o.study_kinds, vec![StudyKind::Association, StudyKind::Profiling]);
        assert_eq!(o.min_study_overlap, 3);
    }

    #[test]
    fn rejects_bad_input() {
        for pairs in [
            [("colour", "blue")],
            [("strand_constraint", "both")],
            [("min_overlap_threshold", "0")],
            [("min_overlap_threshold", "1.01")],
            [("alternative", "sideways")],
            [("correction_method", "magic")],
            [("significance_level", "1.5")],
            [("max_distance", "5001")],
            [("max_distance", "-1")],
            [("study_kinds", "gwas")],
        ] {
            let err = AnalysisOptions::from_config(&config(&pairs)).unwrap_err();
            assert!(matches!(err, EpilapError::Validation(_)), "{pairs:?}");
        }
    }

    #[test]
    fn criteria_from_options() {
        let o = AnalysisOptions {
            strand_constraint: StrandMode::Same,
            min_overlap_threshold: Some(0.5),
            ..Default::default()
        };
        let c = o.criteria().unwrap();
        assert_eq!(c.strand, StrandMode::Same);
        assert_eq!(c.min_fraction, Some(0.5));
    }
}
