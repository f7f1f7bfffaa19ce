//! HTTP(S) retriever.

use crate::error::{ErrorKind, Result};
use crate::{BoxAsyncRead, Retriever};
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use std::io;
use tracing::instrument;

/// Retrieves artifacts over HTTP(S), following redirects.
///
/// Non-success statuses are failures; the body of an error page is never
/// handed back as if it were the artifact. Bodies are streamed, never
/// buffered whole.
#[derive(Clone, Debug)]
pub struct HttpRetriever {
    name: String,
    client: reqwest::Client,
}

impl HttpRetriever {
    /// Create a retriever with a default client.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rpmorder/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Retrieval("unable to initialise HTTP client".to_string()))?;
        Ok(Self { name: name.into(), client })
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(retriever = %self.name))]
    async fn reader(&self, source: &str) -> Result<BoxAsyncRead> {
        let failed = |e: reqwest::Error| ErrorKind::Retrieval(format!("GET {source}: {e}"));
        let response = self.client.get(source).send().await.map_err(failed)?;
        let response = response.error_for_status().map_err(failed)?;
        tracing::debug!(size = response.content_length(), "streaming");
        let source = source.to_string();
        let body = response.bytes_stream().map_err(move |e| io::Error::other(format!("GET {source}: {e}")));
        Ok(Box::new(Box::pin(body).into_async_read()))
    }
}
