//! In-memory retriever for testing.

use crate::error::{ErrorKind, Result};
use crate::{BoxAsyncRead, Retriever};
use async_trait::async_trait;
use futures::TryStreamExt;
use futures::io::Cursor;
use futures::stream;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// In-memory retriever for testing.
///
/// Sources are kept in a `HashMap` keyed by their full location. Every call
/// is counted per source, and the highest number of simultaneous calls is
/// recorded, so tests can assert on idempotency and concurrency bounds
/// without a network. A source added with [`insert_broken`](Self::insert_broken)
/// serves its bytes and then fails, like a connection dropped mid-transfer.
///
/// # Examples
///
/// ```
/// use futures::io::AsyncReadExt;
/// use rpmorder_fetch::Retriever;
/// use rpmorder_fetch::retriever::MockRetriever;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let retriever = MockRetriever::with_sources([("https://mirror/repomd.xml", b"<repomd/>")]);
/// let mut body = Vec::new();
/// retriever.reader("https://mirror/repomd.xml").await.unwrap().read_to_end(&mut body).await.unwrap();
/// assert_eq!(body, b"<repomd/>");
/// assert!(retriever.reader("https://mirror/missing").await.is_err());
/// assert_eq!(retriever.calls("https://mirror/repomd.xml"), 1);
/// # }
/// ```
#[derive(Default)]
pub struct MockRetriever {
    sources: Mutex<HashMap<String, Source>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

#[derive(Clone)]
enum Source {
    Complete(Vec<u8>),
    Broken(Vec<u8>),
}
impl Source {
    fn data(&self) -> &[u8] {
        match self {
            Source::Complete(data) | Source::Broken(data) => data,
        }
    }
}

impl MockRetriever {
    /// Create a mock retriever pre-populated with sources.
    pub fn with_sources(sources: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let sources =
            sources.into_iter().map(|(source, data)| (source.into(), Source::Complete(data.into()))).collect();
        Self { sources: Mutex::new(sources), ..Self::default() }
    }

    /// Hold every retrieval open for `delay`, so that concurrent calls
    /// overlap and [`peak_in_flight`](Self::peak_in_flight) is meaningful.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add (or replace) a source.
    pub fn insert(&self, source: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.put(source.into(), Source::Complete(data.into()));
    }

    /// Add (or replace) a source whose transfer fails after `data`.
    pub fn insert_broken(&self, source: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.put(source.into(), Source::Broken(data.into()));
    }

    fn put(&self, source: String, data: Source) {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner).insert(source, data);
    }

    /// The bytes published at `source`, without counting a call.
    pub fn source(&self, source: &str) -> Option<Vec<u8>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner).get(source).map(|s| s.data().to_vec())
    }

    /// Number of times `source` has been requested (found or not).
    pub fn calls(&self, source: &str) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).get(source).copied().unwrap_or(0)
    }

    /// Total number of requests across all sources.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).values().sum()
    }

    /// Highest number of retrievals that were in progress at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn reader(&self, source: &str) -> Result<BoxAsyncRead> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner).entry(source.to_string()).or_default() += 1;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let data = self.sources.lock().unwrap_or_else(PoisonError::into_inner).get(source).cloned();
        match data {
            Some(Source::Complete(data)) => Ok(Box::new(Cursor::new(data))),
            Some(Source::Broken(data)) => {
                let reset = io::Error::new(io::ErrorKind::ConnectionReset, format!("GET {source}: connection reset"));
                Ok(Box::new(stream::iter([Ok(data), Err(reset)]).into_async_read()))
            },
            None => exn::bail!(ErrorKind::Retrieval(format!("GET {source}: 404 Not Found"))),
        }
    }
}
