//! Metadata Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A metadata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening or querying one of the metadata databases failed.
    #[display("database error: {_0}")]
    Database(#[error(not(source))] String),
    /// A database file exists but is not an intact SQLite database.
    #[display("corrupt database: {_0}")]
    Corrupt(#[error(not(source))] String),
    /// The local cache directory could not be prepared.
    #[display("cache error: {}", _0.display())]
    Cache(#[error(not(source))] PathBuf),
    /// A repository metadata descriptor could not be retrieved.
    #[display("download repomd failure: {_0}")]
    DescriptorFailure(#[error(not(source))] String),
    /// A retrieved descriptor is not a well-formed document.
    #[display("invalid repomd: {_0}")]
    InvalidDescriptor(#[error(not(source))] String),
    /// The descriptor has no entry for the requested database.
    #[display("no {_0} entry in repomd")]
    MissingMetadataEntry(#[error(not(source))] String),
    /// A database download location has an extension that is not `.xz` or
    /// `.zst`. Raised before anything is fetched.
    #[display("unsupported compression: {_0}")]
    UnsupportedCompression(#[error(not(source))] String),
    /// A database could not be downloaded into the cache.
    #[display("download db failure: {_0}")]
    DownloadFailure(#[error(not(source))] String),
    /// No package (or package key) with this name exists in the metadata.
    #[display("package not found: {_0}")]
    PackageNotFound(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Downloads resume where they left off, so a failed load is worth
    /// repeating; everything else reflects the metadata itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DescriptorFailure(_) | Self::DownloadFailure(_))
    }
}
