//! Exact significance testing for the epilap enrichment engine.
//!
//! - **Log-space helpers**: [`ln_gamma`], [`ln_binomial`]
//! - **Hypergeometric distribution**: [`Hypergeometric`] with exact upper,
//!   lower and two-sided tails
//! - **Hypothesis testing**: [`hypergeometric_test`], [`fisher_exact`]
//! - **Multiple testing correction**: Bonferroni, Holm, Šidák,
//!   Benjamini-Hochberg, Benjamini-Yekutieli
//!
//! ```
//! use epilap_stats::{fisher_exact, Alternative, ContingencyTable};
//!
//! let table = ContingencyTable::new(8, 2, 3, 7);
//! let result = fisher_exact(&table, Alternative::Greater).unwrap();
//! assert!(result.p_value < 0.05);
//! ```

pub mod combinatorics;
pub mod correction;
pub mod distribution;
pub mod hypergeom;
pub mod testing;

pub use combinatorics::{ln_binomial, ln_factorial};
pub use correction::{correct, CorrectionMethod};
pub use distribution::{ln_gamma, ln_sum_exp};
pub use hypergeom::{Hypergeometric, RELATIVE_TIE};
pub use testing::{fisher_exact, hypergeometric_test, Alternative, ContingencyTable, TestResult};
