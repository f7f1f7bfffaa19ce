//! Retriever trait and implementations.
//!
//! A retriever turns a source location into a stream of the bytes found
//! there. It does not know about destinations, decompression or concurrency;
//! those belong to the [`fetch_all`](crate::fetch_all) batch that drives it.

mod file;
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::file::FileRetriever;
pub use self::http::HttpRetriever;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockRetriever;
use crate::RetrieverHandle;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use futures::io::AsyncRead;
use std::sync::Arc;

/// The body of a retrieved artifact, read as it arrives.
pub type BoxAsyncRead = Box<dyn AsyncRead + Send + Unpin + 'static>;

/// Unified interface for fetching a single artifact.
///
/// # Examples
///
/// ```no_run
/// use futures::io::AsyncReadExt;
/// use rpmorder_fetch::{Retriever, error::{ErrorKind, Result}};
///
/// async fn descriptor(retriever: &dyn Retriever) -> Result<String> {
///     let mut body = retriever.reader("https://mirror/releases/33000/clear/x86_64/os/repodata/repomd.xml").await?;
///     let mut text = String::new();
///     body.read_to_string(&mut text).await.map_err(ErrorKind::Io)?;
///     Ok(text)
/// }
/// ```
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Name of the retriever (used for logging only).
    fn name(&self) -> &str;

    /// Open `source` for reading.
    ///
    /// Failing to open it (unreachable host, non-success status, missing
    /// file) is a [`Retrieval`](crate::error::ErrorKind::Retrieval) error
    /// whose text names the request and the diagnostic. A transfer that
    /// breaks later surfaces as an I/O error from the returned reader.
    async fn reader(&self, source: &str) -> Result<BoxAsyncRead>;
}

/// Pick a retriever for a repository base location.
///
/// `http://` and `https://` locations are fetched over HTTP; `file://`
/// locations and bare absolute paths are read from a local mirror.
pub fn for_source(base: &str) -> Result<RetrieverHandle> {
    if base.starts_with("http://") || base.starts_with("https://") {
        return Ok(Arc::new(HttpRetriever::new("http")?));
    }
    if base.starts_with("file://") || base.starts_with('/') {
        return Ok(Arc::new(FileRetriever::new("mirror")));
    }
    exn::bail!(ErrorKind::UnsupportedSource(base.to_string()))
}
