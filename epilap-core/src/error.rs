//! Structured error types for the epilap crates.

use thiserror::Error;

/// Unified error type for all epilap operations.
///
/// Validation errors are caused by the caller's input and surface
/// immediately. Numeric and consistency errors indicate a bug inside the
/// engine; they are fatal and retrying the same request will not help.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EpilapError {
    /// Malformed input: bad interval, unknown chromosome, invalid table
    /// margins, universe limits, unparsable options.
    #[error("validation error: {0}")]
    Validation(String),

    /// A non-finite value escaped the log-space computations.
    #[error("numeric error: {0}")]
    Numeric(String),

    /// An internal invariant (e.g. contingency margins) does not hold.
    #[error("internal consistency error: {0}")]
    Consistency(String),
}

impl EpilapError {
    /// Shorthand for [`EpilapError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        EpilapError::Validation(msg.into())
    }

    /// Whether the error is an internal failure rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EpilapError::Numeric(_) | EpilapError::Consistency(_))
    }
}

/// Convenience alias used throughout the epilap crates.
pub type Result<T> = std::result::Result<T, EpilapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes() {
        let e = EpilapError::validation("start (5) must be less than end (5)");
        assert_eq!(
            e.to_string(),
            "validation error: start (5) must be less than end (5)"
        );
        assert_eq!(
            EpilapError::Consistency("a + b != n".into()).to_string(),
            "internal consistency error: a + b != n"
        );
    }

    #[test]
    fn fatal_classification() {
        assert!(!EpilapError::validation("x").is_fatal());
        assert!(EpilapError::Numeric("nan".into()).is_fatal());
        assert!(EpilapError::Consistency("c + d".into()).is_fatal());
    }
}
