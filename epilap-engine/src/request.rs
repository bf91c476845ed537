//! Analysis requests and their inputs.

use std::fmt;
use std::str::FromStr;

use epilap_core::{Annotated, EpilapError, Result};
use epilap_omics::{GeneSet, IntervalSet, SetRole, UniverseMode};
use log::warn;

use crate::context::{ReferenceContext, Study};
use crate::options::{AnalysisOptions, ConfigMap};

/// The three analysis workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnalysisMode {
    /// Gene set enrichment: hypergeometric test per reference gene set.
    Gsea,
    /// Locus overlap: Fisher's exact test per reference feature track.
    Loa,
    /// Study overlap: overlap with each repository study.
    Soa,
}

impl FromStr for AnalysisMode {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gsea" => Ok(AnalysisMode::Gsea),
            "loa" => Ok(AnalysisMode::Loa),
            "soa" => Ok(AnalysisMode::Soa),
            _ => Err(EpilapError::validation(format!(
                "analysis mode must be gsea, loa or soa; got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisMode::Gsea => "GSEA",
            AnalysisMode::Loa => "LOA",
            AnalysisMode::Soa => "SOA",
        })
    }
}

/// Anything that resolves to an [`IntervalSet`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnalysisInput {
    Intervals(IntervalSet),
    /// Gene symbols, resolved to loci through the reference annotation.
    Genes(GeneSet),
    Study(Study),
}

impl AnalysisInput {
    pub fn name(&self) -> &str {
        match self {
            AnalysisInput::Intervals(set) => set.name(),
            AnalysisInput::Genes(genes) => genes.name(),
            AnalysisInput::Study(study) => study.id(),
        }
    }

    /// Whether the input is made of gene loci.
    pub fn is_gene_based(&self) -> bool {
        matches!(self, AnalysisInput::Genes(_))
    }

    /// Resolve the input to intervals tagged with `role`.
    ///
    /// Gene symbols missing from the annotation are skipped with a warning;
    /// a gene list of which no symbol resolves is rejected.
    pub fn resolve(&self, context: &ReferenceContext, role: SetRole) -> Result<IntervalSet> {
        let set = match self {
            AnalysisInput::Intervals(set) => set.clone(),
            AnalysisInput::Study(study) => study.intervals().clone(),
            AnalysisInput::Genes(genes) => {
                let resolved = context
                    .annotation()
                    .resolve(genes.name(), genes.genes.iter().map(String::as_str));
                if !resolved.missing.is_empty() {
                    warn!(
                        "{} of {} genes in '{}' not found in the {} annotation: {}",
                        resolved.missing.len(),
                        genes.unique_genes().len(),
                        genes.name(),
                        context.genome(),
                        resolved.missing.join(", ")
                    );
                }
                if resolved.loci.is_empty() {
                    return Err(EpilapError::validation(format!(
                        "no gene of '{}' is annotated in {}",
                        genes.name(),
                        context.genome()
                    )));
                }
                resolved.loci
            }
        };
        Ok(set.with_role(role))
    }
}

impl From<IntervalSet> for AnalysisInput {
    fn from(set: IntervalSet) -> Self {
        AnalysisInput::Intervals(set)
    }
}

impl From<GeneSet> for AnalysisInput {
    fn from(genes: GeneSet) -> Self {
        AnalysisInput::Genes(genes)
    }
}

impl From<Study> for AnalysisInput {
    fn from(study: Study) -> Self {
        AnalysisInput::Study(study)
    }
}

/// Background universe combined from up to five reference tracks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniverseSpec {
    pub tracks: Vec<IntervalSet>,
    pub mode: UniverseMode,
}

/// What the foreground is compared against.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Background {
    Input(AnalysisInput),
    Universe(UniverseSpec),
}

impl From<AnalysisInput> for Background {
    fn from(input: AnalysisInput) -> Self {
        Background::Input(input)
    }
}

impl From<IntervalSet> for Background {
    fn from(set: IntervalSet) -> Self {
        Background::Input(set.into())
    }
}

impl From<GeneSet> for Background {
    fn from(genes: GeneSet) -> Self {
        Background::Input(genes.into())
    }
}

impl From<Study> for Background {
    fn from(study: Study) -> Self {
        Background::Input(study.into())
    }
}

impl From<UniverseSpec> for Background {
    fn from(spec: UniverseSpec) -> Self {
        Background::Universe(spec)
    }
}

/// One analysis to run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    pub foreground: AnalysisInput,
    pub background: Option<Background>,
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    /// A request with default options and no background.
    pub fn new(mode: AnalysisMode, foreground: impl Into<AnalysisInput>) -> Self {
        Self {
            mode,
            foreground: foreground.into(),
            background: None,
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_background(mut self, background: impl Into<Background>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the options with ones parsed from `config`.
    pub fn with_config(self, config: &ConfigMap) -> Result<Self> {
        Ok(self.with_options(AnalysisOptions::from_config(config)?))
    }
}
