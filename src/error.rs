//! Command Error Types

use derive_more::{Display, Error};

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("cannot read from repository `{_0}`")]
    Source(#[error(not(source))] String),
    #[display("failed to load repository metadata")]
    Load,
    #[display("query failed")]
    Query,
    #[display("build order stalled with {_0} package(s) remaining")]
    Stalled(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if running the command again might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Load)
    }
}
