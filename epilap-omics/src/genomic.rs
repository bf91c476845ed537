//! Genomic primitives: chromosome, strand and interval types.
//!
//! These are the foundation types used across the omics crate for representing
//! genomic coordinates. All coordinates are 0-based, half-open `[start, end)`.

use core::fmt;
use core::str::FromStr;

use epilap_core::{EpilapError, Result};

/// Human chromosome, restricted to `1..=22`, `X`, `Y` and `MT`.
///
/// Ordering follows karyotype order: autosomes numerically, then X, Y, MT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Chromosome {
    Autosome(u8),
    X,
    Y,
    Mt,
}

impl Chromosome {
    /// Autosome `n`; only `1..=22` are valid.
    pub fn autosome(n: u8) -> Result<Self> {
        if (1..=22).contains(&n) {
            Ok(Chromosome::Autosome(n))
        } else {
            Err(EpilapError::validation(format!(
                "autosome number must be in 1..=22, got {n}"
            )))
        }
    }

    /// All 25 chromosomes in karyotype order.
    pub fn all() -> impl Iterator<Item = Chromosome> {
        (1..=22)
            .map(Chromosome::Autosome)
            .chain([Chromosome::X, Chromosome::Y, Chromosome::Mt])
    }
}

impl FromStr for Chromosome {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_prefix("chr").unwrap_or(s);
        match name {
            "X" => Ok(Chromosome::X),
            "Y" => Ok(Chromosome::Y),
            "MT" | "M" => Ok(Chromosome::Mt),
            _ => name
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=22).contains(n))
                .map(Chromosome::Autosome)
                .ok_or_else(|| {
                    EpilapError::validation(format!(
                        "unknown chromosome '{s}' (expected 1-22, X, Y or MT)"
                    ))
                }),
        }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chromosome::Autosome(n) => write!(f, "{n}"),
            Chromosome::X => write!(f, "X"),
            Chromosome::Y => write!(f, "Y"),
            Chromosome::Mt => write!(f, "MT"),
        }
    }
}

/// Strand orientation on a reference genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    /// Returns `true` if this is the forward (+) strand.
    pub fn is_forward(&self) -> bool {
        matches!(self, Strand::Forward)
    }

    /// Returns `true` if this is the reverse (-) strand.
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }

    /// `+` and `-` are opposite; the unknown strand is opposite to nothing.
    pub fn is_opposite(&self, other: Strand) -> bool {
        matches!(
            (self, other),
            (Strand::Forward, Strand::Reverse) | (Strand::Reverse, Strand::Forward)
        )
    }
}

impl FromStr for Strand {
    type Err = EpilapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." => Ok(Strand::Unknown),
            _ => Err(EpilapError::validation(format!(
                "strand must be one of '+', '-', '.', got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
            Strand::Unknown => write!(f, "."),
        }
    }
}

/// A half-open interval `[start, end)` on a chromosome (0-based).
///
/// Fields are public for cheap pattern matching, so collections that accept
/// intervals re-check `start < end` with [`GenomicInterval::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenomicInterval {
    pub chrom: Chromosome,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

impl GenomicInterval {
    /// Create a new interval on the unknown strand.
    ///
    /// Returns an error if `start >= end`.
    pub fn new(chrom: Chromosome, start: u64, end: u64) -> Result<Self> {
        Self::with_strand(chrom, start, end, Strand::Unknown)
    }

    /// Create a new interval with an explicit strand.
    ///
    /// Returns an error if `start >= end`.
    pub fn with_strand(chrom: Chromosome, start: u64, end: u64, strand: Strand) -> Result<Self> {
        let iv = Self {
            chrom,
            start,
            end,
            strand,
        };
        iv.validate()?;
        Ok(iv)
    }

    /// Build an interval from already-parsed text fields of a submission record.
    pub fn parse(chrom: &str, start: u64, end: u64, strand: &str) -> Result<Self> {
        Self::with_strand(chrom.parse()?, start, end, strand.parse()?)
    }

    /// Check the `start < end` invariant.
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(EpilapError::validation(format!(
                "interval {}:{}-{} has start >= end",
                self.chrom, self.start, self.end
            )));
        }
        Ok(())
    }

    /// Length of the interval in bases.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the interval has zero length (never true for valid intervals).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether a 0-based position falls within `[start, end)`.
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.end
    }

    /// Whether this interval overlaps with `other` (must be on the same chromosome).
    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    /// Number of shared bases with `other` (0 if disjoint).
    pub fn overlap_len(&self, other: &GenomicInterval) -> u64 {
        if !self.overlaps(other) {
            return 0;
        }
        self.end.min(other.end) - self.start.max(other.start)
    }

    /// Shared bases divided by the length of the shorter of the two intervals.
    pub fn overlap_fraction(&self, other: &GenomicInterval) -> f64 {
        let shorter = self.len().min(other.len());
        if shorter == 0 {
            return 0.0;
        }
        self.overlap_len(other) as f64 / shorter as f64
    }

    /// Return the overlapping region, or `None` if the intervals don't overlap.
    pub fn intersect(&self, other: &GenomicInterval) -> Option<GenomicInterval> {
        if !self.overlaps(other) {
            return None;
        }
        Some(GenomicInterval {
            chrom: self.chrom,
            start: self.start.max(other.start),
            end: self.end.min(other.end),
            strand: self.strand,
        })
    }

    /// Merge two overlapping intervals into their union, or `None` if they don't overlap.
    pub fn merge(&self, other: &GenomicInterval) -> Option<GenomicInterval> {
        if !self.overlaps(other) {
            return None;
        }
        Some(GenomicInterval {
            chrom: self.chrom,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            strand: self.strand,
        })
    }

    /// Widen the interval by `flank` bases on both sides, saturating at 0.
    pub fn widen(&self, flank: u64) -> GenomicInterval {
        GenomicInterval {
            start: self.start.saturating_sub(flank),
            end: self.end.saturating_add(flank),
            ..*self
        }
    }

    /// Distance between two intervals, or `None` if they are on different chromosomes.
    /// Returns 0 if the intervals overlap.
    pub fn distance(&self, other: &GenomicInterval) -> Option<u64> {
        if self.chrom != other.chrom {
            return None;
        }
        if self.overlaps(other) {
            return Some(0);
        }
        if self.end <= other.start {
            Some(other.start - self.end)
        } else {
            Some(self.start - other.end)
        }
    }

    /// The midpoint of the interval (rounded down).
    pub fn midpoint(&self) -> u64 {
        (self.start + self.end) / 2
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}({})",
            self.chrom, self.start, self.end, self.strand
        )
    }
}
