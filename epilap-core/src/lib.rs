//! Shared primitives and traits for the epilap enrichment engine.
//!
//! `epilap-core` is the foundation the other epilap crates build on:
//!
//! - **Error types**: [`EpilapError`] and [`Result`] for structured error handling
//! - **Traits**: small cross-crate abstractions like [`Annotated`] and [`Summarizable`]

pub mod error;
pub mod traits;

pub use error::{EpilapError, Result};
pub use traits::*;
