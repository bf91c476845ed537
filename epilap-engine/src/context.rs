//! Read-only reference data an analysis is scored against.
//!
//! A [`ReferenceContext`] bundles everything that belongs to one reference
//! genome: its gene catalogue, the gene-set collection used by GSEA, the
//! feature tracks tested by LOA and the repository studies compared by SOA.
//! It is handed to the pipeline explicitly for each request.

use std::fmt;
use std::str::FromStr;

use epilap_core::{Annotated, EpilapError, Result, Summarizable};
use epilap_omics::{GeneAnnotation, GeneSet, GenomicInterval, IntervalSet};

/// Kind of a repository study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StudyKind {
    /// Variant-trait association records with p-values.
    Association,
    /// Chromatin interaction records with p-values.
    Interaction,
    /// Epigenomic profiling records, no p-values.
    Profiling,
}

impl StudyKind {
    /// Whether records of this kind carry a p-value.
    pub fn has_p_values(&self) -> bool {
        !matches!(self, StudyKind::Profiling)
    }
}

impl FromStr for StudyKind {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "association" => Ok(StudyKind::Association),
            "interaction" => Ok(StudyKind::Interaction),
            "profiling" => Ok(StudyKind::Profiling),
            _ => Err(EpilapError::validation(format!(
                "study kind must be association, interaction or profiling; got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for StudyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StudyKind::Association => "association",
            StudyKind::Interaction => "interaction",
            StudyKind::Profiling => "profiling",
        })
    }
}

/// A repository study: interval records, with one p-value per record for
/// association and interaction studies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "StudyFields"))]
pub struct Study {
    id: String,
    kind: StudyKind,
    intervals: IntervalSet,
    p_values: Option<Vec<f64>>,
}

/// Deserialized form of a [`Study`], checked by [`Study::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct StudyFields {
    id: String,
    kind: StudyKind,
    intervals: IntervalSet,
    p_values: Option<Vec<f64>>,
}

#[cfg(feature = "serde")]
impl TryFrom<StudyFields> for Study {
    type Error = EpilapError;

    fn try_from(fields: StudyFields) -> Result<Self> {
        Study::new(fields.id, fields.kind, fields.intervals, fields.p_values)
    }
}

impl Study {
    /// Create a study, checking that p-values are present exactly when the
    /// kind requires them, one per record, each in `[0, 1]`.
    pub fn new(
        id: impl Into<String>,
        kind: StudyKind,
        intervals: IntervalSet,
        p_values: Option<Vec<f64>>,
    ) -> Result<Self> {
        let id = id.into();
        match (&p_values, kind.has_p_values()) {
            (None, true) => {
                return Err(EpilapError::validation(format!(
                    "{kind} study '{id}' needs one p-value per record"
                )))
            }
            (Some(_), false) => {
                return Err(EpilapError::validation(format!(
                    "profiling study '{id}' must not carry p-values"
                )))
            }
            (Some(p), true) => {
                if p.len() != intervals.len() {
                    return Err(EpilapError::validation(format!(
                        "study '{id}': {} p-values for {} records",
                        p.len(),
                        intervals.len()
                    )));
                }
                if let Some((i, bad)) = p.iter().enumerate().find(|(_, p)| !(0.0..=1.0).contains(*p)) {
                    return Err(EpilapError::validation(format!(
                        "study '{id}': p-value of record {i} is out of range [0, 1]: {bad}"
                    )));
                }
            }
            (None, false) => {}
        }
        Ok(Self {
            id,
            kind,
            intervals,
            p_values,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StudyKind {
        self.kind
    }

    pub fn intervals(&self) -> &IntervalSet {
        &self.intervals
    }

    pub fn p_values(&self) -> Option<&[f64]> {
        self.p_values.as_deref()
    }

    /// Records paired with their p-value, if any.
    pub fn records(&self) -> impl Iterator<Item = (&GenomicInterval, Option<f64>)> {
        let p = self.p_values.as_deref();
        self.intervals
            .intervals()
            .iter()
            .enumerate()
            .map(move |(i, iv)| (iv, p.and_then(|p| p.get(i).copied())))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

impl Annotated for Study {
    fn name(&self) -> &str {
        &self.id
    }
}

/// A reference feature track tested by LOA (e.g. a chromatin state or a
/// regulatory element catalogue), labelled with its collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureTrack {
    pub intervals: IntervalSet,
    pub collection: Option<String>,
}

impl FeatureTrack {
    pub fn new(intervals: IntervalSet) -> Self {
        Self {
            intervals,
            collection: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

impl Annotated for FeatureTrack {
    fn name(&self) -> &str {
        self.intervals.name()
    }

    fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}

/// Reference data for one genome build.
#[derive(Debug, Clone, Default)]
pub struct ReferenceContext {
    genome: String,
    annotation: GeneAnnotation,
    gene_sets: Vec<GeneSet>,
    tracks: Vec<FeatureTrack>,
    studies: Vec<Study>,
}

impl ReferenceContext {
    pub fn new(genome: impl Into<String>, annotation: GeneAnnotation) -> Self {
        Self {
            genome: genome.into(),
            annotation,
            ..Default::default()
        }
    }

    pub fn with_gene_sets(mut self, gene_sets: Vec<GeneSet>) -> Self {
        self.gene_sets = gene_sets;
        self
    }

    pub fn with_tracks(mut self, tracks: Vec<FeatureTrack>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_studies(mut self, studies: Vec<Study>) -> Self {
        self.studies = studies;
        self
    }

    pub fn genome(&self) -> &str {
        &self.genome
    }

    pub fn annotation(&self) -> &GeneAnnotation {
        &self.annotation
    }

    pub fn gene_sets(&self) -> &[GeneSet] {
        &self.gene_sets
    }

    pub fn tracks(&self) -> &[FeatureTrack] {
        &self.tracks
    }

    pub fn studies(&self) -> &[Study] {
        &self.studies
    }

    /// Gene sets whose collection is listed in `collections`, in catalogue
    /// order. An empty filter selects every set.
    pub fn gene_sets_in(&self, collections: &[String]) -> Vec<&GeneSet> {
        self.gene_sets
            .iter()
            .filter(|gs| in_collections(gs.collection(), collections))
            .collect()
    }

    /// Feature tracks filtered like [`gene_sets_in`](Self::gene_sets_in).
    pub fn tracks_in(&self, collections: &[String]) -> Vec<&FeatureTrack> {
        self.tracks
            .iter()
            .filter(|t| in_collections(t.collection(), collections))
            .collect()
    }

    /// Studies of the listed kinds, in repository order. An empty filter
    /// selects every study.
    pub fn studies_of(&self, kinds: &[StudyKind]) -> Vec<&Study> {
        self.studies
            .iter()
            .filter(|s| kinds.is_empty() || kinds.contains(&s.kind()))
            .collect()
    }
}

fn in_collections(collection: Option<&str>, filter: &[String]) -> bool {
    filter.is_empty() || collection.is_some_and(|c| filter.iter().any(|f| f == c))
}

impl Summarizable for ReferenceContext {
    fn summary(&self) -> String {
        format!(
            "ReferenceContext '{}': {} genes, {} gene sets, {} tracks, {} studies",
            self.genome,
            self.annotation.len(),
            self.gene_sets.len(),
            self.tracks.len(),
            self.studies.len()
        )
    }
}
