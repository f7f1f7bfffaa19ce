//! Local mirror retriever.

use crate::error::{ErrorKind, Result};
use crate::{BoxAsyncRead, Retriever};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio_util::compat::TokioAsyncReadCompatExt;

/// Reads artifacts from a repository mirror on the local filesystem.
///
/// Accepts both `file:///abs/path` locations and bare absolute paths, so a
/// mirror can be configured either way.
#[derive(Clone, Debug)]
pub struct FileRetriever {
    name: String,
}

impl FileRetriever {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn local_path(source: &str) -> &Path {
        Path::new(source.strip_prefix("file://").unwrap_or(source))
    }
}

#[async_trait]
impl Retriever for FileRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reader(&self, source: &str) -> Result<BoxAsyncRead> {
        let path = Self::local_path(source);
        let file =
            File::open(path).await.map_err(|e| ErrorKind::Retrieval(format!("read {}: {e}", path.display())))?;
        Ok(Box::new(file.compat()))
    }
}
