//! BEDTools-style genome arithmetic on genomic intervals.
//!
//! All functions take plain slices of [`GenomicInterval`], such as
//! [`IntervalSet::intervals()`](crate::IntervalSet::intervals).
//! Coordinates are 0-based, half-open `[start, end)`.

use std::collections::BTreeMap;
use std::str::FromStr;

use epilap_core::{EpilapError, Result};

use crate::genomic::{Chromosome, GenomicInterval, Strand};
use crate::interval::{IntervalIndex, OverlapCriteria};

/// How to handle strand when comparing intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrandMode {
    /// Ignore strand (default BEDTools behavior).
    #[default]
    Ignore,
    /// Only match intervals on the same strand (`-s`).
    Same,
    /// Only match intervals on the opposite strand (`-S`).
    Opposite,
}

impl StrandMode {
    /// Whether `a` and `b` may be compared under this mode.
    pub fn matches(&self, a: Strand, b: Strand) -> bool {
        match self {
            StrandMode::Ignore => true,
            StrandMode::Same => a == b,
            StrandMode::Opposite => a.is_opposite(b),
        }
    }
}

impl FromStr for StrandMode {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "ignore" => Ok(StrandMode::Ignore),
            "same" => Ok(StrandMode::Same),
            "opposite" => Ok(StrandMode::Opposite),
            _ => Err(EpilapError::validation(format!(
                "strand_constraint must be one of none, same, opposite; got '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Group intervals by chromosome, sorting each group by start position.
pub(crate) fn group_by_chrom(
    intervals: &[GenomicInterval],
) -> BTreeMap<Chromosome, Vec<&GenomicInterval>> {
    let mut groups: BTreeMap<Chromosome, Vec<&GenomicInterval>> = BTreeMap::new();
    for iv in intervals {
        groups.entry(iv.chrom).or_default().push(iv);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|iv| (iv.start, iv.end));
    }
    groups
}

/// Merge a slice of intervals that are already sorted by start on a single chromosome.
/// Abutting intervals (end == next.start) are merged. A merged interval keeps
/// its members' strand only when they all agree.
fn merge_sorted(sorted: &[&GenomicInterval]) -> Vec<GenomicInterval> {
    let Some(first) = sorted.first() else {
        return Vec::new();
    };
    let mut merged = Vec::new();
    let mut current = **first;

    for iv in &sorted[1..] {
        if iv.start <= current.end {
            current.end = current.end.max(iv.end);
            if current.strand != iv.strand {
                current.strand = Strand::Unknown;
            }
        } else {
            merged.push(current);
            current = **iv;
        }
    }
    merged.push(current);
    merged
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Merge overlapping and abutting intervals.
///
/// When `strand_mode` is [`StrandMode::Same`], intervals are grouped by
/// (chromosome, strand) before merging. Otherwise strand is ignored.
/// Output is sorted by chromosome, then start.
pub fn merge(intervals: &[GenomicInterval], strand_mode: StrandMode) -> Vec<GenomicInterval> {
    if intervals.is_empty() {
        return Vec::new();
    }

    if strand_mode == StrandMode::Same {
        let mut groups: BTreeMap<(Chromosome, Strand), Vec<&GenomicInterval>> = BTreeMap::new();
        for iv in intervals {
            groups.entry((iv.chrom, iv.strand)).or_default().push(iv);
        }
        let mut result = Vec::new();
        for group in groups.values_mut() {
            group.sort_by_key(|iv| (iv.start, iv.end));
            result.extend(merge_sorted(group));
        }
        result.sort_by_key(|iv| (iv.chrom, iv.start, iv.end));
        result
    } else {
        let groups = group_by_chrom(intervals);
        let mut result = Vec::new();
        for group in groups.values() {
            result.extend(merge_sorted(group));
        }
        result
    }
}

/// Union of two interval sets (concatenate + merge).
pub fn union(
    a: &[GenomicInterval],
    b: &[GenomicInterval],
    strand_mode: StrandMode,
) -> Vec<GenomicInterval> {
    let mut combined: Vec<GenomicInterval> = Vec::with_capacity(a.len() + b.len());
    combined.extend_from_slice(a);
    combined.extend_from_slice(b);
    merge(&combined, strand_mode)
}

/// Intersect two interval sets, returning the overlapping sub-regions.
///
/// For each pair of overlapping intervals (one from `a`, one from `b`)
/// allowed by `strand_mode`, emits `max(a.start, b.start)..min(a.end, b.end)`
/// carrying `a`'s strand. Pairs are found through an [`IntervalIndex`] on `b`.
pub fn intersect(
    a: &[GenomicInterval],
    b: &[GenomicInterval],
    strand_mode: StrandMode,
) -> Result<Vec<GenomicInterval>> {
    let index = IntervalIndex::build(b)?;
    let criteria = OverlapCriteria::new(strand_mode);
    let mut result = Vec::new();
    for a_iv in a {
        a_iv.validate()?;
        result.extend(
            index
                .overlaps(a_iv, &criteria)
                .into_iter()
                .filter_map(|b_iv| a_iv.intersect(b_iv)),
        );
    }
    Ok(result)
}

/// Intersect two sets after merging each, by a linear sweep per chromosome.
///
/// The result is merged and sorted; strand is ignored.
pub fn intersect_merged(a: &[GenomicInterval], b: &[GenomicInterval]) -> Vec<GenomicInterval> {
    let a = merge(a, StrandMode::Ignore);
    let b = merge(b, StrandMode::Ignore);
    let (mut i, mut j) = (0, 0);
    let mut result = Vec::new();

    while i < a.len() && j < b.len() {
        let (x, y) = (&a[i], &b[j]);
        if x.chrom != y.chrom {
            if x.chrom < y.chrom {
                i += 1;
            } else {
                j += 1;
            }
            continue;
        }
        let start = x.start.max(y.start);
        let end = x.end.min(y.end);
        if start < end {
            let strand = if x.strand == y.strand { x.strand } else { Strand::Unknown };
            result.push(GenomicInterval {
                chrom: x.chrom,
                start,
                end,
                strand,
            });
        }
        // Advance whichever interval finishes first
        if x.end <= y.end {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

/// Return intervals from `a` that have any overlap with `b` (BEDTools `-u`).
pub fn intersect_report_a(
    a: &[GenomicInterval],
    b: &[GenomicInterval],
    strand_mode: StrandMode,
) -> Result<Vec<GenomicInterval>> {
    let index = IntervalIndex::build(b)?;
    let criteria = OverlapCriteria::new(strand_mode);
    Ok(a.iter()
        .filter(|a_iv| index.any_overlap(a_iv, &criteria))
        .copied()
        .collect())
}

/// Total base pairs covered by the intervals, counting overlapping bases once.
pub fn total_bp(intervals: &[GenomicInterval]) -> u64 {
    merge(intervals, StrandMode::Ignore)
        .iter()
        .map(|iv| iv.len())
        .sum()
}
