//! Interval collections and the sorted per-chromosome overlap index.
//!
//! [`IntervalSet`] is a named, validated list of [`GenomicInterval`]s tagged
//! with a [`SetRole`]. [`IntervalIndex`] keeps each chromosome's intervals
//! sorted by start together with a running maximum of their ends, which makes
//! the sequence binary-searchable even when intervals nest: queries cost
//! O(log n + k).

use std::collections::{BTreeMap, BTreeSet};

use epilap_core::{Annotated, EpilapError, Result, Summarizable};

use crate::genome_arithmetic::{self, StrandMode};
use crate::genomic::{Chromosome, GenomicInterval};

/// Whether a set is the tested sample or the reference it is compared to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetRole {
    #[default]
    Foreground,
    Background,
}

/// Rules deciding whether two intervals count as overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlapCriteria {
    pub strand: StrandMode,
    /// Minimum `overlap_bp / shorter_len`. `None` accepts any positive overlap.
    pub min_fraction: Option<f64>,
}

impl OverlapCriteria {
    /// Any positive overlap, filtered by `strand`.
    pub fn new(strand: StrandMode) -> Self {
        Self {
            strand,
            min_fraction: None,
        }
    }

    /// Require at least `fraction` of the shorter interval to be covered.
    ///
    /// `fraction` must lie in `(0, 1]`.
    pub fn with_min_fraction(mut self, fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(EpilapError::validation(format!(
                "min_overlap_threshold must be in (0, 1], got {fraction}"
            )));
        }
        self.min_fraction = Some(fraction);
        Ok(self)
    }

    /// Whether `hit` counts as an overlap of `query`.
    pub fn accepts(&self, query: &GenomicInterval, hit: &GenomicInterval) -> bool {
        if !query.overlaps(hit) || !self.strand.matches(query.strand, hit.strand) {
            return false;
        }
        match self.min_fraction {
            Some(min) => query.overlap_fraction(hit) >= min,
            None => true,
        }
    }
}

/// One chromosome's intervals sorted by `(start, end)`.
#[derive(Debug, Clone, Default)]
struct ChromBucket {
    intervals: Vec<GenomicInterval>,
    /// `max_end[i]` = max end over `intervals[..=i]`; non-decreasing.
    max_end: Vec<u64>,
}

impl ChromBucket {
    fn new(mut intervals: Vec<GenomicInterval>) -> Self {
        intervals.sort_by_key(|iv| (iv.start, iv.end, iv.strand));
        let mut running = 0;
        let max_end = intervals
            .iter()
            .map(|iv| {
                running = running.max(iv.end);
                running
            })
            .collect();
        Self { intervals, max_end }
    }

    /// Intervals with `end > query.start` and `start < query.end`.
    fn scan<'a>(&'a self, query: GenomicInterval) -> impl Iterator<Item = &'a GenomicInterval> + 'a {
        let first = self.max_end.partition_point(|&end| end <= query.start);
        self.intervals[first..]
            .iter()
            .take_while(move |iv| iv.start < query.end)
            .filter(move |iv| iv.end > query.start)
    }
}

/// Per-chromosome sorted interval index with O(log n + k) overlap queries.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    chroms: BTreeMap<Chromosome, ChromBucket>,
    len: usize,
}

impl IntervalIndex {
    /// Index the given intervals. Any interval with `start >= end` is rejected.
    pub fn build(intervals: &[GenomicInterval]) -> Result<Self> {
        for iv in intervals {
            iv.validate()?;
        }
        Ok(Self::from_valid(intervals.iter().copied()))
    }

    /// Collapse overlapping and abutting intervals, then index the result.
    pub fn build_merged(intervals: &[GenomicInterval]) -> Result<Self> {
        for iv in intervals {
            iv.validate()?;
        }
        let merged = genome_arithmetic::merge(intervals, StrandMode::Ignore);
        Ok(Self::from_valid(merged))
    }

    fn from_valid(intervals: impl IntoIterator<Item = GenomicInterval>) -> Self {
        let mut by_chrom: BTreeMap<Chromosome, Vec<GenomicInterval>> = BTreeMap::new();
        let mut len = 0;
        for iv in intervals {
            by_chrom.entry(iv.chrom).or_default().push(iv);
            len += 1;
        }
        let chroms = by_chrom
            .into_iter()
            .map(|(chrom, ivs)| (chrom, ChromBucket::new(ivs)))
            .collect();
        Self { chroms, len }
    }

    /// Total number of indexed intervals.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Chromosomes with at least one interval, in karyotype order.
    pub fn chromosomes(&self) -> impl Iterator<Item = Chromosome> + '_ {
        self.chroms.keys().copied()
    }

    /// All indexed intervals, sorted by chromosome then start.
    pub fn iter(&self) -> impl Iterator<Item = &GenomicInterval> {
        self.chroms.values().flat_map(|bucket| bucket.intervals.iter())
    }

    fn candidates<'a>(
        &'a self,
        query: &GenomicInterval,
    ) -> impl Iterator<Item = &'a GenomicInterval> + 'a {
        let query = *query;
        self.chroms
            .get(&query.chrom)
            .into_iter()
            .flat_map(move |bucket| bucket.scan(query))
    }

    /// All indexed intervals overlapping `query` under `criteria`, in start order.
    pub fn overlaps(
        &self,
        query: &GenomicInterval,
        criteria: &OverlapCriteria,
    ) -> Vec<&GenomicInterval> {
        self.candidates(query)
            .filter(|hit| criteria.accepts(query, hit))
            .collect()
    }

    /// Number of indexed intervals overlapping `query` under `criteria`.
    pub fn count_overlaps(&self, query: &GenomicInterval, criteria: &OverlapCriteria) -> usize {
        self.candidates(query)
            .filter(|hit| criteria.accepts(query, hit))
            .count()
    }

    /// Whether at least one indexed interval overlaps `query`.
    pub fn any_overlap(&self, query: &GenomicInterval, criteria: &OverlapCriteria) -> bool {
        self.candidates(query).any(|hit| criteria.accepts(query, hit))
    }
}

/// A named collection of genomic intervals.
///
/// Every interval satisfies `start < end`; constructors and [`push`](Self::push)
/// reject anything else.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalSet {
    name: String,
    role: SetRole,
    intervals: Vec<GenomicInterval>,
}

impl IntervalSet {
    /// Create an empty foreground set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: SetRole::Foreground,
            intervals: Vec::new(),
        }
    }

    /// Create a set from existing intervals, validating each one.
    pub fn from_intervals(name: impl Into<String>, intervals: Vec<GenomicInterval>) -> Result<Self> {
        let name = name.into();
        for iv in &intervals {
            iv.validate()
                .map_err(|e| EpilapError::validation(format!("set '{name}': {e}")))?;
        }
        Ok(Self {
            name,
            role: SetRole::Foreground,
            intervals,
        })
    }

    /// Intervals produced by merging or intersecting validated input.
    pub(crate) fn from_validated(name: String, role: SetRole, intervals: Vec<GenomicInterval>) -> Self {
        Self {
            name,
            role,
            intervals,
        }
    }

    /// Tag the set with a role.
    pub fn with_role(mut self, role: SetRole) -> Self {
        self.role = role;
        self
    }

    /// Add an interval after checking `start < end`.
    pub fn push(&mut self, interval: GenomicInterval) -> Result<()> {
        interval.validate()?;
        self.intervals.push(interval);
        Ok(())
    }

    pub fn role(&self) -> SetRole {
        self.role
    }

    /// Number of intervals in the set.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Sort intervals by chromosome then start position.
    pub fn sort(&mut self) {
        self.intervals.sort_by_key(|iv| (iv.chrom, iv.start, iv.end));
    }

    /// Merge all overlapping and abutting intervals into a new, sorted set.
    pub fn merge_overlapping(&self) -> IntervalSet {
        IntervalSet::from_validated(
            self.name.clone(),
            self.role,
            genome_arithmetic::merge(&self.intervals, StrandMode::Ignore),
        )
    }

    /// Build the overlap index over this set.
    pub fn index(&self) -> IntervalIndex {
        IntervalIndex::from_valid(self.intervals.iter().copied())
    }

    /// Borrow the intervals as a slice.
    pub fn intervals(&self) -> &[GenomicInterval] {
        &self.intervals
    }

    /// Consume the set and return the inner intervals.
    pub fn into_intervals(self) -> Vec<GenomicInterval> {
        self.intervals
    }

    /// Distinct chromosomes present in the set.
    pub fn chromosomes(&self) -> BTreeSet<Chromosome> {
        self.intervals.iter().map(|iv| iv.chrom).collect()
    }

    /// Total bases covered (after merging overlaps).
    pub fn total_bp(&self) -> u64 {
        genome_arithmetic::total_bp(&self.intervals)
    }

    /// Total bases covered on a given chromosome (after merging overlaps).
    pub fn coverage(&self, chrom: Chromosome) -> u64 {
        let on_chrom: Vec<GenomicInterval> = self
            .intervals
            .iter()
            .filter(|iv| iv.chrom == chrom)
            .copied()
            .collect();
        genome_arithmetic::total_bp(&on_chrom)
    }
}

impl Annotated for IntervalSet {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Summarizable for IntervalSet {
    fn summary(&self) -> String {
        format!(
            "IntervalSet '{}': {} intervals across {} chromosomes",
            self.name,
            self.len(),
            self.chromosomes().len()
        )
    }
}
