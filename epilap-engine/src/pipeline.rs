//! Request orchestration.
//!
//! A request moves through `received → validated → indexed → tested →
//! corrected → completed`. Every unit of the batch (gene set, track, study)
//! is tested before any correction is applied, and a failure anywhere fails
//! the whole request: no partial results are returned.
//!
//! With the `parallel` feature the units of a batch, and the requests of
//! [`run_batch`], are processed on the rayon thread pool.

use std::fmt;

use epilap_core::{Annotated, EpilapError, Result, Summarizable};
use epilap_omics::{IntervalSet, SetRole, Universe, UniverseCoverage};
use epilap_stats::correct;
use log::{debug, info, warn};

use crate::context::ReferenceContext;
use crate::gsea::GseaWorkflow;
use crate::loa::LoaWorkflow;
use crate::overlap::ResolvedBackground;
use crate::request::{AnalysisInput, AnalysisMode, AnalysisRequest, Background};
use crate::result::{AnalysisReport, AnalysisResult, UnitOutcome};
use crate::soa::SoaWorkflow;

// ── Stages ──────────────────────────────────────────────────────────────────

/// Processing stage of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Received,
    Validated,
    Indexed,
    Tested,
    Corrected,
    Completed,
    Failed,
}

impl Stage {
    /// The stage following `self` on success.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Received => Some(Stage::Validated),
            Stage::Validated => Some(Stage::Indexed),
            Stage::Indexed => Some(Stage::Tested),
            Stage::Tested => Some(Stage::Corrected),
            Stage::Corrected => Some(Stage::Completed),
            Stage::Completed | Stage::Failed => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Indexed => "indexed",
            Stage::Tested => "tested",
            Stage::Corrected => "corrected",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        })
    }
}

/// Stage of one request, advanced strictly in order.
#[derive(Debug)]
struct StageTracker {
    label: String,
    stage: Stage,
}

impl StageTracker {
    fn new(request: &AnalysisRequest) -> Self {
        let label = format!("{} '{}'", request.mode, request.foreground.name());
        debug!("{label}: {}", Stage::Received);
        Self {
            label,
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, to: Stage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(EpilapError::Consistency(format!(
                "{}: illegal transition {} -> {}",
                self.label, self.stage, to
            )));
        }
        debug!("{}: {} -> {}", self.label, self.stage, to);
        self.stage = to;
        Ok(())
    }

    fn fail(&mut self, err: &EpilapError) {
        debug!("{}: {} -> {} ({err})", self.label, self.stage, Stage::Failed);
        self.stage = Stage::Failed;
    }
}

// ── Workflows ───────────────────────────────────────────────────────────────

/// A prepared batch of independent per-unit tests.
pub(crate) trait Workflow: Sync {
    /// Number of units in the batch.
    fn units(&self) -> usize;

    /// Raw outcome of unit `i`, before correction.
    fn test_unit(&self, i: usize) -> Result<UnitOutcome>;

    fn foreground_coverage(&self) -> Option<UniverseCoverage>;

    fn universe_size(&self) -> u64;
}

/// Resolve the request's foreground, rejecting an empty one.
pub(crate) fn resolve_foreground(
    request: &AnalysisRequest,
    context: &ReferenceContext,
) -> Result<IntervalSet> {
    let foreground = request.foreground.resolve(context, SetRole::Foreground)?;
    if foreground.is_empty() {
        return Err(EpilapError::validation(format!(
            "foreground '{}' is empty",
            foreground.name()
        )));
    }
    Ok(foreground)
}

/// Resolve a background to its universe and counting units.
///
/// Gene lists keep one unit per locus; every other background is merged and
/// counted per universe interval.
pub(crate) fn resolve_background(
    background: &Background,
    context: &ReferenceContext,
) -> Result<ResolvedBackground> {
    match background {
        Background::Input(input) => {
            let set = input.resolve(context, SetRole::Background)?;
            if let AnalysisInput::Genes(_) = input {
                ResolvedBackground::from_loci(&set)
            } else {
                ResolvedBackground::from_universe(Universe::from_set(&set)?)
            }
        }
        Background::Universe(spec) => {
            ResolvedBackground::from_universe(Universe::resolve(&spec.tracks, spec.mode)?)
        }
    }
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Run one request and return one result per tested unit, in reference
/// context order.
pub fn run(request: &AnalysisRequest, context: &ReferenceContext) -> Result<Vec<AnalysisResult>> {
    run_report(request, context).map(|report| report.results)
}

/// Like [`run`], also reporting how the foreground fits the universe.
pub fn run_report(request: &AnalysisRequest, context: &ReferenceContext) -> Result<AnalysisReport> {
    let mut tracker = StageTracker::new(request);
    execute(request, context, &mut tracker).map_err(|err| {
        tracker.fail(&err);
        err
    })
}

/// Run independent requests against the same context.
///
/// Each request succeeds or fails on its own; outputs keep request order.
pub fn run_batch(
    requests: &[AnalysisRequest],
    context: &ReferenceContext,
) -> Vec<Result<AnalysisReport>> {
    #[cfg(feature = "parallel")]
    let reports = {
        use rayon::prelude::*;
        requests
            .par_iter()
            .map(|request| run_report(request, context))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let reports = requests
        .iter()
        .map(|request| run_report(request, context))
        .collect();
    reports
}

fn execute(
    request: &AnalysisRequest,
    context: &ReferenceContext,
    tracker: &mut StageTracker,
) -> Result<AnalysisReport> {
    validate(request, context)?;
    tracker.advance(Stage::Validated)?;
    match request.mode {
        AnalysisMode::Gsea => complete(request, &GseaWorkflow::prepare(request, context)?, tracker),
        AnalysisMode::Loa => complete(request, &LoaWorkflow::prepare(request, context)?, tracker),
        AnalysisMode::Soa => complete(request, &SoaWorkflow::prepare(request, context)?, tracker),
    }
}

fn validate(request: &AnalysisRequest, context: &ReferenceContext) -> Result<()> {
    request.options.validate()?;
    if let Some(genome) = &request.options.reference_genome {
        if genome != context.genome() {
            return Err(EpilapError::validation(format!(
                "request is for {genome} but the reference context is {}",
                context.genome()
            )));
        }
    }
    if request.mode == AnalysisMode::Soa && request.background.is_some() {
        warn!(
            "SOA '{}': background ignored, studies are compared to the foreground directly",
            request.foreground.name()
        );
    }
    Ok(())
}

fn complete<W: Workflow>(
    request: &AnalysisRequest,
    workflow: &W,
    tracker: &mut StageTracker,
) -> Result<AnalysisReport> {
    tracker.advance(Stage::Indexed)?;

    if let Some(coverage) = workflow.foreground_coverage() {
        let outside = coverage.total - coverage.inside;
        if outside > 0 {
            // an explicit background must contain the whole foreground
            if request.background.is_some() {
                return Err(EpilapError::validation(format!(
                    "{} '{}': foreground is not a subset of the background ({} of {} intervals outside)",
                    request.mode,
                    request.foreground.name(),
                    outside,
                    coverage.total
                )));
            }
            warn!(
                "{} '{}': {} of {} foreground intervals lie outside the universe",
                request.mode,
                request.foreground.name(),
                outside,
                coverage.total
            );
        }
    }

    let outcomes = test_all(workflow)?;
    tracker.advance(Stage::Tested)?;

    let adjusted = correct_batch(&outcomes, request)?;
    tracker.advance(Stage::Corrected)?;

    let alpha = request.options.significance_level;
    let results = outcomes
        .into_iter()
        .zip(adjusted)
        .map(|(outcome, adj)| outcome.finish(adj, alpha))
        .collect();
    let report = AnalysisReport {
        mode: request.mode,
        results,
        foreground_coverage: workflow.foreground_coverage(),
        universe_size: workflow.universe_size(),
    };
    tracker.advance(Stage::Completed)?;
    info!("{}", report.summary());
    Ok(report)
}

fn test_all<W: Workflow>(workflow: &W) -> Result<Vec<UnitOutcome>> {
    #[cfg(feature = "parallel")]
    let outcomes = {
        use rayon::prelude::*;
        (0..workflow.units())
            .into_par_iter()
            .map(|i| workflow.test_unit(i))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes = (0..workflow.units()).map(|i| workflow.test_unit(i)).collect();
    outcomes
}

/// Correct the tested p-values as one batch; untested units stay `None`.
fn correct_batch(outcomes: &[UnitOutcome], request: &AnalysisRequest) -> Result<Vec<Option<f64>>> {
    let raw: Vec<f64> = outcomes.iter().filter_map(|o| o.p_value).collect();
    let mut adjusted = if raw.is_empty() {
        Vec::new()
    } else {
        correct(&raw, request.options.correction_method)?
    }
    .into_iter();

    let scattered = outcomes
        .iter()
        .map(|o| match o.p_value {
            Some(_) => adjusted.next().map(Some).ok_or_else(|| {
                EpilapError::Consistency(format!(
                    "correction returned fewer values than the {} tested units",
                    raw.len()
                ))
            }),
            None => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;
    if adjusted.next().is_some() {
        return Err(EpilapError::Consistency(
            "correction returned more values than tested units".into(),
        ));
    }
    Ok(scattered)
}
