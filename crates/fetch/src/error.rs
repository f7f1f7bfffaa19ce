//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use rpmorder_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The retrieval itself failed, when opening the source or part way
    /// through the transfer; carries the request and the diagnostic text
    /// (e.g. `GET https://... : 404 Not Found`).
    #[display("retrieval failed: {_0}")]
    Retrieval(#[error(not(source))] String),
    /// No retriever knows how to handle this kind of source location.
    #[display("unsupported source: {_0}")]
    UnsupportedSource(#[error(not(source))] String),
    /// The retrieved bytes could not be decompressed into the destination.
    #[display("decompression failed: {_0}")]
    Decompression(CompressionErrorKind),
    /// Destination has no file name to write to.
    #[display("invalid destination: {}", _0.display())]
    InvalidDestination(#[error(not(source))] PathBuf),
    /// Underlying I/O error while writing the destination.
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
impl ErrorKind {
    /// Convert a compression error into a fetch error, preserving the
    /// compress crate's `Exn` frame (error tree) as a child in its own
    /// error tree.
    #[track_caller]
    pub fn decompression(err: CompressionError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Decompression(inner))
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retrieval(_) | Self::Io(_))
    }
}
