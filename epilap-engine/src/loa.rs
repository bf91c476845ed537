//! Locus overlap: the foreground against every reference feature track.

use epilap_core::{Annotated, EpilapError, Result};
use epilap_omics::{IntervalSet, OverlapCriteria, SizeMode, UniverseCoverage};
use epilap_stats::{fisher_exact, Alternative};
use log::debug;

use crate::context::{FeatureTrack, ReferenceContext};
use crate::overlap::{contingency_table, contingency_table_bp, ResolvedBackground, UnitMask};
use crate::pipeline::{resolve_background, resolve_foreground, Workflow};
use crate::request::AnalysisRequest;
use crate::result::UnitOutcome;

pub(crate) struct LoaWorkflow<'a> {
    tracks: Vec<&'a FeatureTrack>,
    background: ResolvedBackground,
    foreground: IntervalSet,
    /// Foreground units; only used when counting intervals.
    foreground_units: UnitMask,
    criteria: OverlapCriteria,
    alternative: Alternative,
    size_unit: SizeMode,
    coverage: UniverseCoverage,
}

impl<'a> LoaWorkflow<'a> {
    pub fn prepare(request: &AnalysisRequest, context: &'a ReferenceContext) -> Result<Self> {
        let options = &request.options;
        let background = match &request.background {
            Some(bg) => resolve_background(bg, context)?,
            None => {
                return Err(EpilapError::validation(
                    "LOA needs a background set or universe",
                ))
            }
        };

        let tracks = context.tracks_in(&options.collections);
        if tracks.is_empty() {
            return Err(EpilapError::validation(format!(
                "no feature tracks to test in {} (collections: {:?})",
                context.genome(),
                options.collections
            )));
        }

        let foreground = resolve_foreground(request, context)?;
        let coverage = background.coverage_of(&foreground);
        let foreground_units = background
            .units
            .hits(foreground.intervals(), &OverlapCriteria::default(), 0)?;
        debug!(
            "LOA '{}': {} of {} units hit, {} bp universe, {} tracks",
            foreground.name(),
            foreground_units.count(),
            background.units.len(),
            background.size(SizeMode::BasePairs),
            tracks.len()
        );

        Ok(Self {
            tracks,
            background,
            foreground,
            foreground_units,
            criteria: options.criteria()?,
            alternative: options.alternative,
            size_unit: options.size_unit,
            coverage,
        })
    }
}

impl Workflow for LoaWorkflow<'_> {
    fn units(&self) -> usize {
        self.tracks.len()
    }

    fn test_unit(&self, i: usize) -> Result<UnitOutcome> {
        let track = self.tracks[i];
        let table = match self.size_unit {
            SizeMode::IntervalCount => {
                let features = self.background.units.feature_hits(
                    self.foreground.intervals(),
                    &self.foreground_units,
                    track.intervals.intervals(),
                    &self.criteria,
                    0,
                )?;
                contingency_table(&self.foreground_units, &features)?
            }
            SizeMode::BasePairs => contingency_table_bp(
                &self.background.universe,
                self.foreground.intervals(),
                track.intervals.intervals(),
            )?,
        };
        let test = fisher_exact(&table, self.alternative)?;
        debug!("track '{}': {} p={:.3e}", track.name(), table, test.p_value);

        Ok(UnitOutcome {
            name: track.name().to_string(),
            collection: track.collection().map(String::from),
            statistic: test.statistic,
            p_value: Some(test.p_value),
            effect_size: table.odds_ratio(),
            overlap_count: table.a,
            universe_size: table.total(),
            min_overlap: 0,
        })
    }

    fn foreground_coverage(&self) -> Option<UniverseCoverage> {
        Some(self.coverage)
    }

    fn universe_size(&self) -> u64 {
        self.background.size(self.size_unit)
    }
}
