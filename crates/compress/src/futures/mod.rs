//! Async decompression operations.
//!
//! Uses [`futures::io`] traits (`AsyncRead`/`AsyncWrite`) rather than
//! Tokio-specific types; Tokio files go through `tokio-util`'s compat layer.

pub(crate) mod ops;
pub(crate) mod peekable;
