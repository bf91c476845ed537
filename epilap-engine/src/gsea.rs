//! Gene set enrichment: the foreground against every reference gene set.
//!
//! Each gene set is mapped onto the background units through the gene
//! annotation and scored with the one-sided hypergeometric test
//! `P(X ≥ k)`, `X ~ Hypergeometric(N, K, n)`. Without an explicit
//! background every annotated gene locus is a unit. A foreground interval
//! hits a gene when, widened by `max_distance`, it overlaps the gene's locus
//! under the request's strand and overlap-fraction rules.

use epilap_core::{Annotated, EpilapError, Result};
use epilap_omics::{GeneAnnotation, GeneSet, IntervalSet, OverlapCriteria, SizeMode, UniverseCoverage};
use epilap_stats::hypergeometric_test;
use log::debug;

use crate::context::ReferenceContext;
use crate::overlap::{HypergeometricCounts, ResolvedBackground, UnitMask};
use crate::pipeline::{resolve_background, resolve_foreground, Workflow};
use crate::request::AnalysisRequest;
use crate::result::UnitOutcome;

/// Name given to the fallback background of all annotated loci.
const ANNOTATED_GENES: &str = "annotated genes";

pub(crate) struct GseaWorkflow<'a> {
    gene_sets: Vec<&'a GeneSet>,
    annotation: &'a GeneAnnotation,
    background: ResolvedBackground,
    foreground: IntervalSet,
    foreground_units: UnitMask,
    criteria: OverlapCriteria,
    max_distance: u64,
    coverage: UniverseCoverage,
}

impl<'a> GseaWorkflow<'a> {
    pub fn prepare(request: &AnalysisRequest, context: &'a ReferenceContext) -> Result<Self> {
        let options = &request.options;
        if options.size_unit == SizeMode::BasePairs {
            return Err(EpilapError::validation(
                "GSEA counts gene units; size_unit base_pairs is only valid for LOA",
            ));
        }

        let gene_sets = context.gene_sets_in(&options.collections);
        if gene_sets.is_empty() {
            return Err(EpilapError::validation(format!(
                "no gene sets to test in {} (collections: {:?})",
                context.genome(),
                options.collections
            )));
        }

        let foreground = resolve_foreground(request, context)?;
        let background = match &request.background {
            Some(bg) => resolve_background(bg, context)?,
            None => ResolvedBackground::from_loci(&context.annotation().all_loci(ANNOTATED_GENES))?,
        };
        let coverage = background.coverage_of(&foreground);
        let mask = background.units.hits(
            foreground.intervals(),
            &OverlapCriteria::default(),
            options.max_distance,
        )?;
        debug!(
            "GSEA '{}': {} of {} units hit, {} gene sets",
            foreground.name(),
            mask.count(),
            background.units.len(),
            gene_sets.len()
        );

        Ok(Self {
            gene_sets,
            annotation: context.annotation(),
            background,
            foreground,
            foreground_units: mask,
            criteria: options.criteria()?,
            max_distance: options.max_distance,
            coverage,
        })
    }
}

impl Workflow for GseaWorkflow<'_> {
    fn units(&self) -> usize {
        self.gene_sets.len()
    }

    fn test_unit(&self, i: usize) -> Result<UnitOutcome> {
        let gene_set = self.gene_sets[i];
        let resolved = self
            .annotation
            .resolve(gene_set.name(), gene_set.genes.iter().map(String::as_str));
        if !resolved.missing.is_empty() {
            debug!(
                "gene set '{}': {} genes without locus",
                gene_set.name(),
                resolved.missing.len()
            );
        }
        let category = self.background.units.feature_hits(
            self.foreground.intervals(),
            &self.foreground_units,
            resolved.loci.intervals(),
            &self.criteria,
            self.max_distance,
        )?;
        let counts = HypergeometricCounts::from_masks(&self.foreground_units, &category)?;
        let test = hypergeometric_test(
            counts.population,
            counts.successes,
            counts.draws,
            counts.observed,
        )?;
        debug!(
            "gene set '{}': N={} K={} n={} k={} p={:.3e}",
            gene_set.name(),
            counts.population,
            counts.successes,
            counts.draws,
            counts.observed,
            test.p_value
        );

        Ok(UnitOutcome {
            name: gene_set.name().to_string(),
            collection: gene_set.collection().map(String::from),
            statistic: test.statistic,
            p_value: Some(test.p_value),
            effect_size: counts.fold_enrichment(),
            overlap_count: counts.observed,
            universe_size: counts.population,
            min_overlap: 0,
        })
    }

    fn foreground_coverage(&self) -> Option<UniverseCoverage> {
        Some(self.coverage)
    }

    fn universe_size(&self) -> u64 {
        self.background.size(SizeMode::IntervalCount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalysisMode;
    use epilap_omics::{Chromosome, Gene, GenomicInterval, Strand, StrandMode};

    fn locus(start: u64) -> GenomicInterval {
        GenomicInterval::new(Chromosome::autosome(3).unwrap(), start, start + 100).unwrap()
    }

    /// G0..G9 at 0, 1000, ..., 9000.
    fn context() -> ReferenceContext {
        let genes = (0..10)
            .map(|i| Gene::new(format!("G{i}"), locus(i * 1000)).unwrap())
            .collect();
        ReferenceContext::new("GRCh38", GeneAnnotation::new(genes).unwrap()).with_gene_sets(vec![
            GeneSet::new("first", ["G0", "G1", "G2"]).with_collection("H"),
            GeneSet::new("last", ["G8", "G9"]).with_collection("C2"),
        ])
    }

    #[test]
    fn counts_against_annotated_loci() {
        let ctx = context();
        let request = AnalysisRequest::new(AnalysisMode::Gsea, GeneSet::new("fg", ["G0", "G1", "G5"]));
        let workflow = GseaWorkflow::prepare(&request, &ctx).unwrap();
        assert_eq!(workflow.units(), 2);
        assert_eq!(workflow.universe_size(), 10);

        let first = workflow.test_unit(0).unwrap();
        assert_eq!(first.overlap_count, 2);
        assert_eq!(first.collection.as_deref(), Some("H"));
        // P(X >= 2), N=10 K=3 n=3: (C(3,2)C(7,1) + 1) / C(10,3)
        let expected = (3.0 * 7.0 + 1.0) / 120.0;
        assert!((first.p_value.unwrap() - expected).abs() < 1e-12);
        assert!((first.effect_size - (2.0 / 3.0) / 0.3).abs() < 1e-12);

        let last = workflow.test_unit(1).unwrap();
        assert_eq!(last.overlap_count, 0);
        assert_eq!(last.p_value, Some(1.0));
    }

    #[test]
    fn max_distance_widens_hits() {
        let ctx = context();
        let fg = IntervalSet::from_intervals("fg", vec![locus(50)]).unwrap();
        let mut request = AnalysisRequest::new(AnalysisMode::Gsea, fg);
        let touching = GseaWorkflow::prepare(&request, &ctx).unwrap().test_unit(0).unwrap();
        assert_eq!(touching.overlap_count, 1);

        // 200bp after G0 ends
        let far = IntervalSet::from_intervals("fg", vec![locus(300)]).unwrap();
        request.foreground = far.into();
        assert_eq!(GseaWorkflow::prepare(&request, &ctx).unwrap().test_unit(0).unwrap().overlap_count, 0);
        request.options.max_distance = 250;
        assert_eq!(GseaWorkflow::prepare(&request, &ctx).unwrap().test_unit(0).unwrap().overlap_count, 1);
    }

    #[test]
    fn strand_and_threshold_apply_to_gene_loci() {
        let on = |start: u64, strand: Strand| {
            GenomicInterval::with_strand(Chromosome::autosome(3).unwrap(), start, start + 100, strand)
                .unwrap()
        };
        let genes = vec![
            Gene::new("PLUS", on(0, Strand::Forward)).unwrap(),
            Gene::new("MINUS", on(1000, Strand::Reverse)).unwrap(),
            Gene::new("OTHER", on(2000, Strand::Forward)).unwrap(),
        ];
        let ctx = ReferenceContext::new("GRCh38", GeneAnnotation::new(genes).unwrap())
            .with_gene_sets(vec![GeneSet::new("pair", ["PLUS", "MINUS"])]);
        // forward peaks over PLUS (fully) and MINUS (10bp of 100)
        let fg = IntervalSet::from_intervals(
            "fg",
            vec![on(0, Strand::Forward), on(1090, Strand::Forward)],
        )
        .unwrap();
        let mut request = AnalysisRequest::new(AnalysisMode::Gsea, fg);
        let observed = |request: &AnalysisRequest| {
            let workflow = GseaWorkflow::prepare(request, &ctx).unwrap();
            let outcome = workflow.test_unit(0).unwrap();
            assert_eq!(outcome.universe_size, 3);
            outcome.overlap_count
        };

        assert_eq!(observed(&request), 2);
        request.options.strand_constraint = StrandMode::Same;
        assert_eq!(observed(&request), 1);
        request.options.strand_constraint = StrandMode::Opposite;
        assert_eq!(observed(&request), 1);
        request.options.strand_constraint = StrandMode::Ignore;
        request.options.min_overlap_threshold = Some(0.5);
        assert_eq!(observed(&request), 1);
    }

    #[test]
    fn rejects_base_pairs_and_empty_collection() {
        let ctx = context();
        let mut request = AnalysisRequest::new(AnalysisMode::Gsea, GeneSet::new("fg", ["G0"]));
        request.options.size_unit = SizeMode::BasePairs;
        assert!(GseaWorkflow::prepare(&request, &ctx).is_err());
        request.options.size_unit = SizeMode::IntervalCount;
        request.options.collections = vec!["C7".into()];
        assert!(GseaWorkflow::prepare(&request, &ctx).is_err());
    }
}
