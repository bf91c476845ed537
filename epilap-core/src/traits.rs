//! Core trait definitions shared across the epilap crates.

/// A type that carries a name (interval set, gene set, study, track).
pub trait Annotated {
    /// A human-readable name or identifier.
    fn name(&self) -> &str;

    /// An optional grouping label, such as a gene-set collection.
    fn collection(&self) -> Option<&str> {
        None
    }
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
