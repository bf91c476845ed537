//! Result records returned to the caller.

use epilap_core::Summarizable;
use epilap_omics::UniverseCoverage;

use crate::request::AnalysisMode;

/// Added to adjusted p-values before taking logs so that p = 0 stays finite.
pub const SCORE_EPSILON: f64 = f64::MIN_POSITIVE;

/// Outcome of one tested unit (gene set, track or study).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisResult {
    /// Gene set, track or study name.
    pub name: String,
    pub collection: Option<String>,
    pub test_statistic: f64,
    /// `None` only for profiling studies, which are not tested.
    pub raw_p_value: Option<f64>,
    pub adjusted_p_value: Option<f64>,
    /// Fold enrichment (GSEA), odds ratio (LOA) or overlap fraction (SOA).
    pub effect_size: f64,
    pub overlap_count: u64,
    pub universe_size: u64,
    /// `-log10(adjusted + ε) · effect_size`, when tested.
    pub combined_score: Option<f64>,
    pub significant: bool,
}

impl AnalysisResult {
    /// `true` when the unit was not tested (profiling studies).
    pub fn is_untested(&self) -> bool {
        self.raw_p_value.is_none()
    }
}

impl Summarizable for AnalysisResult {
    fn summary(&self) -> String {
        match self.adjusted_p_value {
            Some(adj) => format!(
                "{}: overlap={}/{}, effect={:.3}, p_adj={:.3e}{}",
                self.name,
                self.overlap_count,
                self.universe_size,
                self.effect_size,
                adj,
                if self.significant { " *" } else { "" }
            ),
            None => format!(
                "{}: overlap={}/{}, effect={:.3}{}",
                self.name,
                self.overlap_count,
                self.universe_size,
                self.effect_size,
                if self.significant { " *" } else { "" }
            ),
        }
    }
}

/// Raw outcome of one unit, before batch correction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UnitOutcome {
    pub name: String,
    pub collection: Option<String>,
    pub statistic: f64,
    pub p_value: Option<f64>,
    pub effect_size: f64,
    pub overlap_count: u64,
    pub universe_size: u64,
    /// Overlap count required on top of the p-value cut-off.
    pub min_overlap: u64,
}

impl UnitOutcome {
    /// Final record given the batch-corrected p-value.
    pub fn finish(self, adjusted: Option<f64>, significance_level: f64) -> AnalysisResult {
        let enough_overlap = self.overlap_count >= self.min_overlap;
        let significant = match adjusted {
            Some(adj) => adj <= significance_level && enough_overlap,
            None => enough_overlap,
        };
        let combined_score =
            adjusted.map(|adj| (-(adj + SCORE_EPSILON).log10()).max(0.0) * self.effect_size);
        AnalysisResult {
            name: self.name,
            collection: self.collection,
            test_statistic: self.statistic,
            raw_p_value: self.p_value,
            adjusted_p_value: adjusted,
            effect_size: self.effect_size,
            overlap_count: self.overlap_count,
            universe_size: self.universe_size,
            combined_score,
            significant,
        }
    }
}

/// Results of one request plus how well the foreground fits its universe.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisReport {
    pub mode: AnalysisMode,
    pub results: Vec<AnalysisResult>,
    /// Foreground intervals touching the universe; `None` for SOA.
    pub foreground_coverage: Option<UniverseCoverage>,
    /// Universe size in the counting unit of the request.
    pub universe_size: u64,
}

impl AnalysisReport {
    pub fn significant(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| r.significant)
    }
}

impl Summarizable for AnalysisReport {
    fn summary(&self) -> String {
        format!(
            "{}: {} results, {} significant, universe size {}",
            self.mode,
            self.results.len(),
            self.significant().count(),
            self.universe_size
        )
    }
}
