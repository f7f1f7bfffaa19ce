//! Graph Error Types
//!
//! Graph mutation is infallible; the only failures come from the capability
//! index consulted while building a graph.

use derive_more::{Display, Error};

/// A graph error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The capability index could not answer for this package (unknown
    /// package, unreadable metadata). The inner frame has the details.
    #[display("capability lookup failed for package: {_0}")]
    Lookup(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
