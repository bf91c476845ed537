//! Study overlap: the foreground against every repository study.
//!
//! The count is the number of study records that overlap the foreground,
//! reported as a fraction of the foreground size. For association and
//! interaction studies only records whose p-value passes `significance_level`
//! are counted; the study's p-value is the smallest p-value among all records
//! the foreground overlaps and is corrected across the batch of studies.
//! Profiling studies carry no p-values: every overlapping record counts and
//! nothing is tested.

use epilap_core::{Annotated, EpilapError, Result};
use epilap_omics::{IntervalIndex, IntervalSet, OverlapCriteria, UniverseCoverage};
use log::debug;

use crate::context::{ReferenceContext, Study};
use crate::pipeline::{resolve_foreground, Workflow};
use crate::request::AnalysisRequest;
use crate::result::UnitOutcome;

pub(crate) struct SoaWorkflow<'a> {
    studies: Vec<&'a Study>,
    foreground: IntervalSet,
    foreground_index: IntervalIndex,
    criteria: OverlapCriteria,
    significance_level: f64,
    min_overlap: u64,
}

impl<'a> SoaWorkflow<'a> {
    pub fn prepare(request: &AnalysisRequest, context: &'a ReferenceContext) -> Result<Self> {
        let options = &request.options;
        let studies = context.studies_of(&options.study_kinds);
        if studies.is_empty() {
            return Err(EpilapError::validation(format!(
                "no studies to compare in {} (kinds: {:?})",
                context.genome(),
                options.study_kinds
            )));
        }
        let foreground = resolve_foreground(request, context)?;
        let foreground_index = foreground.index();
        debug!(
            "SOA '{}': {} intervals, {} studies",
            foreground.name(),
            foreground.len(),
            studies.len()
        );
        Ok(Self {
            studies,
            foreground,
            foreground_index,
            criteria: options.criteria()?,
            significance_level: options.significance_level,
            min_overlap: options.min_study_overlap,
        })
    }
}

impl Workflow for SoaWorkflow<'_> {
    fn units(&self) -> usize {
        self.studies.len()
    }

    fn test_unit(&self, i: usize) -> Result<UnitOutcome> {
        let study = self.studies[i];
        let alpha = self.significance_level;

        let mut count = 0u64;
        let mut min_p = 1.0f64;
        for (record, p) in study.records() {
            if !self.foreground_index.any_overlap(record, &self.criteria) {
                continue;
            }
            if p.map_or(true, |p| p <= alpha) {
                count += 1;
            }
            if let Some(p) = p {
                min_p = min_p.min(p);
            }
        }
        let p_value = study.kind().has_p_values().then_some(min_p);

        let total = self.foreground.len() as u64;
        let fraction = count as f64 / total as f64;
        debug!(
            "study '{}' ({}): {} records over {} foreground intervals, min p {:?}",
            study.id(),
            study.kind(),
            count,
            total,
            p_value
        );

        Ok(UnitOutcome {
            name: study.id().to_string(),
            collection: Some(study.kind().to_string()),
            statistic: fraction,
            p_value,
            effect_size: fraction,
            overlap_count: count,
            universe_size: total,
            min_overlap: self.min_overlap,
        })
    }

    fn foreground_coverage(&self) -> Option<UniverseCoverage> {
        None
    }

    fn universe_size(&self) -> u64 {
        self.foreground.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StudyKind;
    use crate::request::AnalysisMode;
    use epilap_omics::{Chromosome, GeneAnnotation, GenomicInterval, Strand, StrandMode};

    fn iv(start: u64, end: u64) -> GenomicInterval {
        GenomicInterval::new(Chromosome::autosome(7).unwrap(), start, end).unwrap()
    }

    fn set(name: &str, ivs: Vec<GenomicInterval>) -> IntervalSet {
        IntervalSet::from_intervals(name, ivs).unwrap()
    }

    fn context() -> ReferenceContext {
        ReferenceContext::new("GRCh38", GeneAnnotation::default()).with_studies(vec![
            Study::new(
                "gwas",
                StudyKind::Association,
                set("gwas", vec![iv(0, 10), iv(100, 110), iv(500, 510)]),
                Some(vec![1e-8, 0.2, 1e-3]),
            )
            .unwrap(),
            Study::new("atac", StudyKind::Profiling, set("atac", vec![iv(95, 205)]), None).unwrap(),
        ])
    }

    fn request() -> AnalysisRequest {
        let fg = set("fg", vec![iv(5, 15), iv(105, 115), iv(200, 300), iv(900, 950)]);
        AnalysisRequest::new(AnalysisMode::Soa, fg)
    }

    #[test]
    fn association_counts_significant_records() {
        let ctx = context();
        let workflow = SoaWorkflow::prepare(&request(), &ctx).unwrap();
        let gwas = workflow.test_unit(0).unwrap();
        // record at 100 has p = 0.2 and is not counted
        assert_eq!(gwas.overlap_count, 1);
        assert_eq!(gwas.p_value, Some(1e-8));
        assert!((gwas.effect_size - 0.25).abs() < 1e-12);
        assert_eq!(gwas.universe_size, 4);
        assert_eq!(gwas.collection.as_deref(), Some("association"));
    }

    #[test]
    fn profiling_is_untested() {
        let ctx = context();
        let workflow = SoaWorkflow::prepare(&request(), &ctx).unwrap();
        let atac = workflow.test_unit(1).unwrap();
        // one record spanning two foreground intervals
        assert_eq!(atac.overlap_count, 1);
        assert_eq!(atac.p_value, None);
    }

    #[test]
    fn counts_records_not_foreground_intervals() {
        let ctx = ReferenceContext::new("GRCh38", GeneAnnotation::default()).with_studies(vec![
            Study::new(
                "eqtl",
                StudyKind::Association,
                set("eqtl", vec![iv(210, 211), iv(220, 221), iv(230, 231), iv(5000, 5001)]),
                Some(vec![1e-5, 1e-4, 0.5, 1e-9]),
            )
            .unwrap(),
        ]);
        let workflow = SoaWorkflow::prepare(&request(), &ctx).unwrap();
        let eqtl = workflow.test_unit(0).unwrap();
        // three records inside [200, 300), one of them above alpha
        assert_eq!(eqtl.overlap_count, 2);
        assert!((eqtl.effect_size - 0.5).abs() < 1e-12);
        assert_eq!(eqtl.p_value, Some(1e-5));
    }

    #[test]
    fn strand_rule_applies_to_records() {
        let on = |start: u64, strand: Strand| {
            GenomicInterval::with_strand(Chromosome::autosome(7).unwrap(), start, start + 10, strand)
                .unwrap()
        };
        let ctx = ReferenceContext::new("GRCh38", GeneAnnotation::default()).with_studies(vec![
            Study::new(
                "hic",
                StudyKind::Interaction,
                set("hic", vec![on(0, Strand::Forward), on(100, Strand::Reverse)]),
                Some(vec![1e-3, 1e-6]),
            )
            .unwrap(),
        ]);
        let fg = set("fg", vec![on(0, Strand::Forward), on(100, Strand::Forward)]);
        let mut req = AnalysisRequest::new(AnalysisMode::Soa, fg);
        req.options.strand_constraint = StrandMode::Same;
        let hic = SoaWorkflow::prepare(&req, &ctx).unwrap().test_unit(0).unwrap();
        assert_eq!(hic.overlap_count, 1);
        assert_eq!(hic.p_value, Some(1e-3));
    }

    #[test]
    fn no_overlap_gives_p_one() {
        let ctx = context();
        let far = set("far", vec![iv(10_000, 10_100)]);
        let workflow = SoaWorkflow::prepare(&AnalysisRequest::new(AnalysisMode::Soa, far), &ctx).unwrap();
        let gwas = workflow.test_unit(0).unwrap();
        assert_eq!(gwas.overlap_count, 0);
        assert_eq!(gwas.p_value, Some(1.0));
    }

    #[test]
    fn kind_filter() {
        let ctx = context();
        let mut req = request();
        req.options.study_kinds = vec![StudyKind::Interaction];
        assert!(SoaWorkflow::prepare(&req, &ctx).is_err());
        req.options.study_kinds = vec![StudyKind::Profiling];
        assert_eq!(SoaWorkflow::prepare(&req, &ctx).unwrap().units(), 1);
    }
}
