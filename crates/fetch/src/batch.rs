//! Bounded, idempotent batch retrieval.

use crate::Retriever;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use futures::future::join_all;
use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use rpmorder_compress::Compression;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs;
use tokio::sync::Semaphore;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::instrument;

/// One artifact to retrieve: where it comes from, where it goes, and whether
/// it has to be decompressed on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchItem {
    pub source: String,
    pub destination: PathBuf,
    pub decompress: Option<Compression>,
}
impl FetchItem {
    /// An item written to disk exactly as retrieved.
    pub fn new(source: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), destination: destination.into(), decompress: None }
    }

    /// Decompress the retrieved bytes with `format` before writing them.
    pub fn with_decompression(mut self, format: Compression) -> Self {
        self.decompress = Some(format);
        self
    }
}

/// What happened to an item that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetched {
    /// The destination already existed; nothing was retrieved.
    AlreadyPresent,
    /// The artifact was retrieved and this many bytes were written.
    Written(u64),
}

/// Retrieve every item, with at most `max_concurrent` retrievals in flight.
///
/// - Items whose destination already exists are skipped without touching the
///   retriever, which makes re-running a partially failed batch cheap.
/// - A failing item does not cancel the others; the call returns once every
///   item has finished.
/// - Results are aligned with `items`. Checking them (and aborting on the
///   first error) is the caller's decision.
///
/// The concurrency bound is owned by this call: each batch gets its own
/// semaphore and nothing outlives it.
#[instrument(skip_all, fields(retriever = retriever.name(), items = items.len(), max_concurrent = max_concurrent))]
pub async fn fetch_all(retriever: &dyn Retriever, items: &[FetchItem], max_concurrent: usize) -> Vec<Result<Fetched>> {
    let permits = Semaphore::new(max_concurrent.max(1));
    join_all(items.iter().map(|item| fetch_one(retriever, item, &permits))).await
}

async fn fetch_one(retriever: &dyn Retriever, item: &FetchItem, permits: &Semaphore) -> Result<Fetched> {
    let destination = &item.destination;
    if fs::try_exists(destination).await.map_err(ErrorKind::Io)? {
        tracing::debug!(destination = %destination.display(), "already present, skipping");
        return Ok(Fetched::AlreadyPresent);
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
    }
    let partial = partial_path(destination)?;

    let _permit = permits
        .acquire()
        .await
        .or_raise(|| ErrorKind::Retrieval(format!("{}: fetch batch closed", item.source)))?;
    tracing::debug!(source = %item.source, destination = %destination.display(), "fetching");
    match write_partial(retriever, item, &partial).await {
        Ok(size) => {
            fs::rename(&partial, destination).await.map_err(ErrorKind::Io)?;
            Ok(Fetched::Written(size))
        },
        Err(e) => {
            // Never leave a half-written artifact behind.
            _ = fs::remove_file(&partial).await;
            Err(e)
        },
    }
}

async fn write_partial(retriever: &dyn Retriever, item: &FetchItem, partial: &Path) -> Result<u64> {
    let body = retriever.reader(&item.source).await?;
    let mut file = fs::File::create(partial).await.map_err(ErrorKind::Io)?.compat_write();
    let mut broken = None;
    let written = copy_body(item, Watched { inner: body, failure: &mut broken }, &mut file).await;
    // A dropped transfer surfaces as whatever was consuming it; report it as
    // the retrieval failure it is.
    if let Some(diagnostic) = broken {
        exn::bail!(ErrorKind::Retrieval(diagnostic));
    }
    written
}

async fn copy_body<R, W>(item: &FetchItem, body: R, file: &mut W) -> Result<u64>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(format) = item.decompress else {
        let written = futures::io::copy(body, file).await.map_err(ErrorKind::Io)?;
        file.close().await.map_err(ErrorKind::Io)?;
        return Ok(written);
    };
    let body = format.async_check_magic_bytes(body).await.map_err(ErrorKind::decompression)?;
    format.async_decompress_stream(body, file).await.map_err(ErrorKind::decompression)
}

/// Remembers the first error of the retrieved stream.
struct Watched<'a, R> {
    inner: R,
    failure: &'a mut Option<String>,
}

impl<R: AsyncRead + Unpin> AsyncRead for Watched<'_, R> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Err(e)) = &poll {
            this.failure.get_or_insert_with(|| e.to_string());
        }
        poll
    }
}

/// `primary.sqlite` becomes `primary.sqlite.part`, next to the destination.
fn partial_path(destination: &Path) -> Result<PathBuf> {
    let mut name = destination
        .file_name()
        .ok_or_raise(|| ErrorKind::InvalidDestination(destination.to_path_buf()))?
        .to_os_string();
    name.push(".part");
    Ok(destination.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::MockRetriever;
    use rpmorder_compress::error::ErrorKind as CompressionErrorKind;
    use std::time::Duration;

    const REPOMD: &str = "https://mirror/releases/100/clear/x86_64/os/repodata/repomd.xml";
    const PRIMARY: &str = "https://mirror/releases/100/clear/x86_64/os/repodata/abc-primary.sqlite.xz";

    #[test]
    fn test_partial_path() {
        let partial = partial_path(Path::new("/cache/100/db/bin-primary")).unwrap();
        assert_eq!(partial, Path::new("/cache/100/db/bin-primary.part"));
        assert!(partial_path(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_writes_raw_and_decompressed_items() {
        let temp_dir = tempfile::tempdir().unwrap();
        let database = b"SQLite format 3\0...".to_vec();
        let retriever = MockRetriever::with_sources([
            (REPOMD, b"<repomd/>".to_vec()),
            (PRIMARY, Compression::Xz.compress(&database).unwrap()),
        ]);
        let items = vec![
            FetchItem::new(REPOMD, temp_dir.path().join("db/bin-repomd.xml")),
            FetchItem::new(PRIMARY, temp_dir.path().join("db/bin-primary")).with_decompression(Compression::Xz),
        ];

        let results = fetch_all(&retriever, &items, 5).await;
        assert_eq!(results.len(), 2);
        assert_eq!(*results[0].as_ref().unwrap(), Fetched::Written(9));
        assert_eq!(*results[1].as_ref().unwrap(), Fetched::Written(database.len() as u64));
        assert_eq!(std::fs::read(temp_dir.path().join("db/bin-repomd.xml")).unwrap(), b"<repomd/>");
        assert_eq!(std::fs::read(temp_dir.path().join("db/bin-primary")).unwrap(), database);
        assert!(!temp_dir.path().join("db/bin-primary.part").exists());
    }

    #[tokio::test]
    async fn test_second_batch_retrieves_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let retriever = MockRetriever::with_sources([(REPOMD, b"<repomd/>")]);
        let items = vec![FetchItem::new(REPOMD, temp_dir.path().join("bin-repomd.xml"))];

        let first = fetch_all(&retriever, &items, 1).await;
        assert!(matches!(first[0], Ok(Fetched::Written(_))));
        let second = fetch_all(&retriever, &items, 1).await;
        assert!(matches!(second[0], Ok(Fetched::AlreadyPresent)));
        assert_eq!(retriever.calls(REPOMD), 1);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_aligned() {
        let temp_dir = tempfile::tempdir().unwrap();
        let retriever = MockRetriever::with_sources([(REPOMD, b"<repomd/>")]);
        let missing = "https://mirror/releases/100/clear/source/SRPMS/repodata/repomd.xml";
        let items = vec![
            FetchItem::new(missing, temp_dir.path().join("src-repomd.xml")),
            FetchItem::new(REPOMD, temp_dir.path().join("bin-repomd.xml")),
        ];

        let results = fetch_all(&retriever, &items, 2).await;
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(&**err, ErrorKind::Retrieval(text) if text.contains(missing)));
        assert!(results[1].is_ok());
        assert!(!temp_dir.path().join("src-repomd.xml").exists());
        assert!(!temp_dir.path().join("src-repomd.xml.part").exists());
        assert!(temp_dir.path().join("bin-repomd.xml").exists());
    }

    #[tokio::test]
    async fn test_wrong_format_leaves_no_destination() {
        let temp_dir = tempfile::tempdir().unwrap();
        let retriever = MockRetriever::with_sources([(PRIMARY, b"<html>Service Unavailable</html>")]);
        let destination = temp_dir.path().join("bin-primary");
        let items = vec![FetchItem::new(PRIMARY, &destination).with_decompression(Compression::Xz)];

        let results = fetch_all(&retriever, &items, 1).await;
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(&**err, ErrorKind::Decompression(CompressionErrorKind::InvalidData)));
        assert!(!destination.exists());
        // The next attempt retrieves again rather than trusting a bad file.
        _ = fetch_all(&retriever, &items, 1).await;
        assert_eq!(retriever.calls(PRIMARY), 2);
    }

    #[tokio::test]
    async fn test_dropped_transfer_is_a_retrieval_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let database = b"SQLite format 3\0".repeat(1024);
        let compressed = Compression::Xz.compress(&database).unwrap();
        let retriever = MockRetriever::default();
        retriever.insert_broken(PRIMARY, &compressed[..compressed.len() / 2]);
        retriever.insert_broken(REPOMD, b"<repo".to_vec());
        let primary = temp_dir.path().join("bin-primary");
        let repomd = temp_dir.path().join("bin-repomd.xml");
        let items = vec![
            FetchItem::new(PRIMARY, &primary).with_decompression(Compression::Xz),
            FetchItem::new(REPOMD, &repomd),
        ];

        let results = fetch_all(&retriever, &items, 2).await;
        for result in &results {
            let err = result.as_ref().unwrap_err();
            assert!(matches!(&**err, ErrorKind::Retrieval(text) if text.contains("connection reset")), "{err:?}");
            assert!(err.is_retryable());
        }
        for destination in [&primary, &repomd] {
            assert!(!destination.exists());
            assert!(!partial_path(destination).unwrap().exists());
        }
    }

    #[tokio::test]
    async fn test_corrupt_body_is_a_decompression_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        // Right magic bytes, then garbage where the stream header should be.
        let mut corrupt = vec![0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
        corrupt.extend_from_slice(b"this is not an xz stream header at all");
        let retriever = MockRetriever::with_sources([(PRIMARY, corrupt)]);
        let destination = temp_dir.path().join("bin-primary");
        let items = vec![FetchItem::new(PRIMARY, &destination).with_decompression(Compression::Xz)];

        let results = fetch_all(&retriever, &items, 1).await;
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(&**err, ErrorKind::Decompression(CompressionErrorKind::InvalidData)), "{err:?}");
        assert!(!destination.exists());
        assert!(!partial_path(&destination).unwrap().exists());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sources: Vec<(String, Vec<u8>)> =
            (0..8).map(|i| (format!("https://mirror/artifact-{i}"), vec![b'x'; 16])).collect();
        let retriever = MockRetriever::with_sources(sources.clone()).with_delay(Duration::from_millis(20));
        let items: Vec<FetchItem> = sources
            .iter()
            .enumerate()
            .map(|(i, (source, _))| FetchItem::new(source.clone(), temp_dir.path().join(format!("artifact-{i}"))))
            .collect();

        let results = fetch_all(&retriever, &items, 3).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(retriever.total_calls(), 8);
        assert!(retriever.peak_in_flight() <= 3);
        assert!(retriever.peak_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let temp_dir = tempfile::tempdir().unwrap();
        let retriever = MockRetriever::with_sources([(REPOMD, b"<repomd/>")]);
        let items = vec![FetchItem::new(REPOMD, temp_dir.path().join("bin-repomd.xml"))];
        let results = fetch_all(&retriever, &items, 0).await;
        assert!(results[0].is_ok());
    }
}
