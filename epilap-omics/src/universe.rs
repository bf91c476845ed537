//! Background universes combined from reference tracks.
//!
//! A [`Universe`] is the bounded space an overlap or enrichment test is scored
//! against. It is resolved from one to [`MAX_UNIVERSE_TRACKS`] reference
//! [`IntervalSet`]s, either as their union or as their intersection, and is
//! always stored merged and sorted.

use std::str::FromStr;

use epilap_core::{Annotated, EpilapError, Result, Summarizable};
use log::debug;

use crate::genome_arithmetic::{self, StrandMode};
use crate::genomic::GenomicInterval;
use crate::interval::{IntervalIndex, IntervalSet, OverlapCriteria, SetRole};

/// Maximum number of reference tracks a universe may combine.
pub const MAX_UNIVERSE_TRACKS: usize = 5;

/// How reference tracks are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UniverseMode {
    #[default]
    Union,
    Intersection,
}

impl FromStr for UniverseMode {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "union" => Ok(UniverseMode::Union),
            "intersection" => Ok(UniverseMode::Intersection),
            _ => Err(EpilapError::validation(format!(
                "universe mode must be 'union' or 'intersection', got '{s}'"
            ))),
        }
    }
}

/// Unit in which a universe (and the counts scored against it) is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeMode {
    /// Number of (merged) universe intervals.
    #[default]
    IntervalCount,
    /// Total covered base pairs.
    BasePairs,
}

impl FromStr for SizeMode {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intervals" | "interval_count" => Ok(SizeMode::IntervalCount),
            "base_pairs" | "bp" => Ok(SizeMode::BasePairs),
            _ => Err(EpilapError::validation(format!(
                "size_unit must be 'intervals' or 'base_pairs', got '{s}'"
            ))),
        }
    }
}

/// How much of a set falls inside a universe.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniverseCoverage {
    /// Intervals of the set touching the universe.
    pub inside: usize,
    /// All intervals of the set.
    pub total: usize,
}

impl UniverseCoverage {
    /// `inside / total`, 0 for an empty set.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.inside as f64 / self.total as f64
        }
    }
}

/// Merged background space resolved from reference tracks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Universe {
    name: String,
    mode: UniverseMode,
    intervals: Vec<GenomicInterval>,
}

impl Universe {
    /// Combine `tracks` with `mode`.
    ///
    /// Fails when no track or more than [`MAX_UNIVERSE_TRACKS`] tracks are
    /// given, or when the combination covers no bases.
    pub fn resolve(tracks: &[IntervalSet], mode: UniverseMode) -> Result<Self> {
        if tracks.is_empty() {
            return Err(EpilapError::validation(
                "universe needs at least one reference track",
            ));
        }
        if tracks.len() > MAX_UNIVERSE_TRACKS {
            return Err(EpilapError::validation(format!(
                "universe accepts at most {MAX_UNIVERSE_TRACKS} tracks, got {}",
                tracks.len()
            )));
        }

        let intervals = match mode {
            UniverseMode::Union => {
                let all: Vec<GenomicInterval> = tracks
                    .iter()
                    .flat_map(|t| t.intervals().iter().copied())
                    .collect();
                genome_arithmetic::merge(&all, StrandMode::Ignore)
            }
            UniverseMode::Intersection => {
                let mut acc = genome_arithmetic::merge(tracks[0].intervals(), StrandMode::Ignore);
                for track in &tracks[1..] {
                    acc = genome_arithmetic::intersect_merged(&acc, track.intervals());
                }
                acc
            }
        };

        let name = tracks
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(match mode {
                UniverseMode::Union => "|",
                UniverseMode::Intersection => "&",
            });
        Self::from_merged(name, mode, intervals)
    }

    /// Use a single background set as the universe, merged.
    pub fn from_set(set: &IntervalSet) -> Result<Self> {
        Self::resolve(std::slice::from_ref(set), UniverseMode::Union)
    }

    fn from_merged(name: String, mode: UniverseMode, intervals: Vec<GenomicInterval>) -> Result<Self> {
        if intervals.is_empty() {
            return Err(EpilapError::validation(format!(
                "universe '{name}' is empty (a universe must have positive size)"
            )));
        }
        debug!(
            "resolved universe '{}' ({:?}): {} intervals",
            name,
            mode,
            intervals.len()
        );
        Ok(Self {
            name,
            mode,
            intervals,
        })
    }

    pub fn mode(&self) -> UniverseMode {
        self.mode
    }

    /// Deterministic size in the requested unit.
    pub fn size(&self, unit: SizeMode) -> u64 {
        match unit {
            SizeMode::IntervalCount => self.intervals.len() as u64,
            SizeMode::BasePairs => self.intervals.iter().map(|iv| iv.len()).sum(),
        }
    }

    /// Merged universe intervals, sorted by chromosome then start.
    pub fn intervals(&self) -> &[GenomicInterval] {
        &self.intervals
    }

    /// Index over the universe intervals.
    pub fn index(&self) -> IntervalIndex {
        self.to_interval_set().index()
    }

    /// The universe as a background [`IntervalSet`].
    pub fn to_interval_set(&self) -> IntervalSet {
        IntervalSet::from_validated(self.name.clone(), SetRole::Background, self.intervals.clone())
    }

    /// Parts of `intervals` lying inside the universe, merged.
    pub fn restrict(&self, intervals: &[GenomicInterval]) -> Vec<GenomicInterval> {
        genome_arithmetic::intersect_merged(intervals, &self.intervals)
    }

    /// Base pairs of `intervals` lying inside the universe.
    pub fn restrict_bp(&self, intervals: &[GenomicInterval]) -> u64 {
        self.restrict(intervals).iter().map(|iv| iv.len()).sum()
    }

    /// How many intervals of `set` touch the universe.
    pub fn coverage_of(&self, set: &IntervalSet) -> UniverseCoverage {
        let index = self.index();
        let criteria = OverlapCriteria::default();
        let inside = set
            .intervals()
            .iter()
            .filter(|iv| index.any_overlap(iv, &criteria))
            .count();
        UniverseCoverage {
            inside,
            total: set.len(),
        }
    }
}

impl Annotated for Universe {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Summarizable for Universe {
    fn summary(&self) -> String {
        format!(
            "Universe '{}' ({:?}): {} intervals, {} bp",
            self.name,
            self.mode,
            self.size(SizeMode::IntervalCount),
            self.size(SizeMode::BasePairs)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomic::Chromosome;

    fn iv(c: u8, start: u64, end: u64) -> GenomicInterval {
        GenomicInterval::new(Chromosome::autosome(c).unwrap(), start, end).unwrap()
    }

    fn set(name: &str, ivs: Vec<GenomicInterval>) -> IntervalSet {
        IntervalSet::from_intervals(name, ivs).unwrap()
    }

    #[test]
    fn union_merges_tracks() {
        let a = set("a", vec![iv(1, 0, 100), iv(2, 0, 10)]);
        let b = set("b", vec![iv(1, 50, 150), iv(1, 300, 400)]);
        let u = Universe::resolve(&[a, b], UniverseMode::Union).unwrap();
        assert_eq!(u.intervals(), &[iv(1, 0, 150), iv(1, 300, 400), iv(2, 0, 10)]);
        assert_eq!(u.size(SizeMode::IntervalCount), 3);
        assert_eq!(u.size(SizeMode::BasePairs), 260);
        assert_eq!(u.name(), "a|b");
    }

    #[test]
    fn intersection_keeps_shared_segments() {
        let a = set("a", vec![iv(1, 0, 100), iv(1, 200, 300)]);
        let b = set("b", vec![iv(1, 50, 250)]);
        let c = set("c", vec![iv(1, 0, 1000)]);
        let u = Universe::resolve(&[a, b, c], UniverseMode::Intersection).unwrap();
        assert_eq!(u.intervals(), &[iv(1, 50, 100), iv(1, 200, 250)]);
    }

    #[test]
    fn intersection_with_itself_is_identity() {
        let a = set("a", vec![iv(1, 0, 100), iv(3, 10, 20)]);
        let u = Universe::resolve(&[a.clone(), a.clone()], UniverseMode::Intersection).unwrap();
        assert_eq!(u.intervals(), a.intervals());
    }

    #[test]
    fn union_with_empty_is_identity() {
        let a = set("a", vec![iv(1, 0, 100), iv(3, 10, 20)]);
        let empty = IntervalSet::new("empty");
        let u = Universe::resolve(&[a.clone(), empty], UniverseMode::Union).unwrap();
        assert_eq!(u.intervals(), a.intervals());
    }

    #[test]
    fn track_count_limits() {
        let a = set("a", vec![iv(1, 0, 100)]);
        assert!(Universe::resolve(&[], UniverseMode::Union).is_err());
        let five = vec![a.clone(); 5];
        assert!(Universe::resolve(&five, UniverseMode::Union).is_ok());
        let six = vec![a; 6];
        let err = Universe::resolve(&six, UniverseMode::Union).unwrap_err();
        assert!(matches!(err, EpilapError::Validation(_)));
    }

    #[test]
    fn empty_universe_rejected() {
        let a = set("a", vec![iv(1, 0, 100)]);
        let b = set("b", vec![iv(2, 0, 100)]);
        assert!(Universe::resolve(&[a, b], UniverseMode::Intersection).is_err());
        assert!(Universe::from_set(&IntervalSet::new("none")).is_err());
    }

    #[test]
    fn restrict_and_coverage() {
        let u = Universe::from_set(&set("u", vec![iv(1, 100, 200), iv(1, 300, 400)])).unwrap();
        assert_eq!(u.restrict_bp(&[iv(1, 150, 350)]), 100);
        let fg = set("fg", vec![iv(1, 120, 130), iv(1, 250, 260), iv(2, 0, 5)]);
        let cov = u.coverage_of(&fg);
        assert_eq!((cov.inside, cov.total), (1, 3));
        assert!((cov.fraction() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn parse_modes() {
        assert_eq!("union".parse::<UniverseMode>().unwrap(), UniverseMode::Union);
        assert_eq!("intersection".parse::<UniverseMode>().unwrap(), UniverseMode::Intersection);
        assert_eq!("base_pairs".parse::<SizeMode>().unwrap(), SizeMode::BasePairs);
        assert!("genes".parse::<SizeMode>().is_err());
    }
}
