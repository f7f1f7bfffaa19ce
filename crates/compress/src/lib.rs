//! Decompression of repository metadata artifacts.
//!
//! Repository descriptors point at metadata databases published in one of two
//! compressed formats. This crate wraps both behind a single [`Compression`]
//! enum, providing:
//!
//! - **Format detection** from file extensions or URLs
//!   ([`Compression::from_path`]) or magic bytes
//!   ([`Compression::from_magic_bytes`], [`Compression::async_check_magic_bytes`])
//! - **Streaming** decompression from any `futures::io::AsyncRead`
//!   ([`Compression::async_wrap_reader`], [`Compression::async_decompress_stream`])
//! - **In-memory** compression for publishing mirrors and fixtures
//!   ([`Compression::compress`])
//!
//! Anything that is not `.xz` or `.zst` is rejected with
//! [`UnsupportedFormat`](crate::error::ErrorKind::UnsupportedFormat) before
//! any bytes are read.

mod construct;
pub mod error;
mod futures;
mod ops;
mod util;

/// A supported compression format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    /// XZ/LZMA compression (.xz)
    Xz,
    /// Zstd compression (.zst)
    Zstd,
}
