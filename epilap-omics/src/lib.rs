//! Genomic interval data structures for the epilap enrichment engine.
//!
//! This crate provides the interval layer the statistical tests run on:
//!
//! - **Genomic coordinates**: [`Chromosome`], [`Strand`], [`GenomicInterval`]
//! - **Interval collections**: [`IntervalSet`] and the sorted [`IntervalIndex`]
//!   with O(log n + k) overlap queries under [`OverlapCriteria`]
//! - **Genome arithmetic**: merge, union and intersection of interval lists
//! - **Universes**: [`Universe`] resolved from up to five reference tracks
//! - **Gene annotation**: [`GeneAnnotation`] and [`GeneSet`]
//!
//! # Quick start
//!
//! ```
//! use epilap_omics::{Chromosome, GenomicInterval, IntervalSet, OverlapCriteria};
//!
//! let peaks = IntervalSet::from_intervals(
//!     "peaks",
//!     vec![
//!         GenomicInterval::new(Chromosome::X, 100, 200).unwrap(),
//!         GenomicInterval::new(Chromosome::X, 150, 400).unwrap(),
//!     ],
//! ).unwrap();
//!
//! let index = peaks.index();
//! let query = GenomicInterval::new(Chromosome::X, 190, 210).unwrap();
//! assert_eq!(index.count_overlaps(&query, &OverlapCriteria::default()), 2);
//! ```

pub mod annotation;
pub mod genome_arithmetic;
pub mod genomic;
pub mod interval;
pub mod universe;

pub use annotation::{Gene, GeneAnnotation, GeneSet, ResolvedGenes};
pub use genome_arithmetic::{intersect, intersect_merged, intersect_report_a, merge, total_bp, union, StrandMode};
pub use genomic::{Chromosome, GenomicInterval, Strand};
pub use interval::{IntervalIndex, IntervalSet, OverlapCriteria, SetRole};
pub use universe::{SizeMode, Universe, UniverseCoverage, UniverseMode, MAX_UNIVERSE_TRACKS};
