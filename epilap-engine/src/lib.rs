//! GSEA, LOA and SOA analysis on top of the epilap interval and statistics
//! crates.
//!
//! - **Requests**: [`AnalysisRequest`] with its [`AnalysisOptions`], built
//!   directly or from a string [`ConfigMap`]
//! - **Reference data**: [`ReferenceContext`] with the gene annotation, gene sets,
//!   feature tracks and studies of one genome build
//! - **Overlap engine**: universe units, hypergeometric counts and 2×2 tables
//! - **Pipeline**: [`run`], [`run_report`] and [`run_batch`]
//!
//! # Example
//!
//! ```
//! use epilap_engine::{run, AnalysisMode, AnalysisRequest, ReferenceContext};
//! use epilap_omics::{Chromosome, Gene, GeneAnnotation, GeneSet, GenomicInterval};
//!
//! let genes = (0..4u64)
//!     .map(|i| {
//!         let locus = GenomicInterval::new(Chromosome::X, i * 1000, i * 1000 + 500).unwrap();
//!         Gene::new(format!("G{i}"), locus).unwrap()
//!     })
//!     .collect();
//! let context = ReferenceContext::new("GRCh38", GeneAnnotation::new(genes).unwrap())
//!     .with_gene_sets(vec![GeneSet::new("pathway", ["G0", "G1"])]);
//!
//! let request = AnalysisRequest::new(AnalysisMode::Gsea, GeneSet::new("hits", ["G0", "G1"]));
//! let results = run(&request, &context).unwrap();
//! assert_eq!(results[0].overlap_count, 2);
//! assert_eq!(results[0].universe_size, 4);
//! ```

pub mod context;
pub mod options;
pub mod overlap;
pub mod pipeline;
pub mod request;
pub mod result;

mod gsea;
mod loa;
mod soa;

pub use context::{FeatureTrack, ReferenceContext, Study, StudyKind};
pub use options::{AnalysisOptions, ConfigMap, KNOWN_KEYS, MAX_DISTANCE};
pub use overlap::{HypergeometricCounts, ResolvedBackground, UnitMask, UnitSpace};
pub use pipeline::{run, run_batch, run_report};
pub use request::{AnalysisInput, AnalysisMode, AnalysisRequest, Background, UniverseSpec};
pub use result::{AnalysisReport, AnalysisResult};
