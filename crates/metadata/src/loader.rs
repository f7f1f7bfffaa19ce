//! Bringing the six metadata databases into the local cache.

use crate::descriptor::Descriptor;
use crate::error::{ErrorKind, Result};
use crate::repo::{DbKey, DbMap, RepoType, Repository};
use crate::{Database, MetadataSet};
use exn::{OptionExt, ResultExt};
use rpmorder_compress::Compression;
use rpmorder_fetch::{FetchItem, Retriever, fetch_all};
use tokio::fs;
use tracing::instrument;

impl Repository {
    /// Open all six metadata databases, downloading whichever are missing.
    ///
    /// 1. The floating snapshot's cache is deleted first.
    /// 2. Every cached database is opened; one that is absent, or present but
    ///    not a SQLite database (and then removed), is missing. Any other
    ///    failure to open a cached file aborts the load and leaves it alone.
    /// 3. Only if something is missing: both descriptors are fetched (or reused
    ///    from the cache), each missing database's location and compression
    ///    are resolved, and they are downloaded in one batch of at most
    ///    `max_concurrent` transfers. Any failure aborts the load; files that
    ///    did arrive stay cached, so the next load resumes.
    /// 4. The downloaded databases are opened.
    #[instrument(skip(self, retriever), fields(uri = self.uri(), version = self.version()))]
    pub async fn load(&self, retriever: &dyn Retriever, max_concurrent: usize) -> Result<MetadataSet> {
        let db_dir = self.db_dir();
        if self.is_floating() && fs::try_exists(&db_dir).await.or_raise(|| ErrorKind::Cache(db_dir.clone()))? {
            tracing::info!(path = %db_dir.display(), "discarding cached floating snapshot");
            fs::remove_dir_all(&db_dir).await.or_raise(|| ErrorKind::Cache(db_dir.clone()))?;
        }

        let mut opened: DbMap<Option<Database>> = DbMap::default();
        let mut missing = Vec::new();
        for key in DbKey::ALL {
            match self.open_cached(key).await? {
                Some(db) => *opened.get_mut(key) = Some(db),
                None => missing.push(key),
            }
        }

        if !missing.is_empty() {
            tracing::info!(missing = missing.len(), "fetching metadata databases");
            self.fetch_missing(retriever, &missing, max_concurrent).await?;
            for key in missing {
                let db = Database::open(key, self.db_path(key))
                    .await
                    .or_raise(|| ErrorKind::DownloadFailure(key.to_string()))?;
                *opened.get_mut(key) = Some(db);
            }
        }

        opened.try_map(|key, db| db.ok_or_raise(|| ErrorKind::Database(key.to_string())))
    }

    async fn open_cached(&self, key: DbKey) -> Result<Option<Database>> {
        let path = self.db_path(key);
        if !fs::try_exists(&path).await.or_raise(|| ErrorKind::Cache(path.clone()))? {
            return Ok(None);
        }
        match Database::open(key, &path).await {
            Ok(db) => Ok(Some(db)),
            Err(e) if matches!(*e, ErrorKind::Corrupt(_)) => {
                tracing::warn!(%key, path = %path.display(), error = ?e, "discarding corrupt cached database");
                fs::remove_file(&path).await.or_raise(|| ErrorKind::Cache(path.clone()))?;
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    async fn fetch_missing(&self, retriever: &dyn Retriever, missing: &[DbKey], max_concurrent: usize) -> Result<()> {
        let descriptors: Vec<FetchItem> = RepoType::ALL
            .into_iter()
            .map(|repo| FetchItem::new(self.descriptor_url(repo), self.descriptor_path(repo)))
            .collect();
        let results = fetch_all(retriever, &descriptors, max_concurrent).await;
        for (item, result) in descriptors.iter().zip(results) {
            result.or_raise(|| ErrorKind::DescriptorFailure(item.source.clone()))?;
        }
        let bin = self.read_descriptor(RepoType::Bin).await?;
        let src = self.read_descriptor(RepoType::Src).await?;

        // Resolve everything before fetching anything.
        let mut items = Vec::with_capacity(missing.len());
        for key in missing {
            let descriptor = match key.repo {
                RepoType::Bin => &bin,
                RepoType::Src => &src,
            };
            let url = self.tree_url(key.repo, descriptor.location(key.name)?);
            let format = Compression::from_path(&url).or_raise(|| ErrorKind::UnsupportedCompression(url.clone()))?;
            tracing::debug!(%key, %url, %format, "resolved database location");
            items.push(FetchItem::new(url, self.db_path(*key)).with_decompression(format));
        }

        let results = fetch_all(retriever, &items, max_concurrent).await;
        for (key, result) in missing.iter().zip(results) {
            result.or_raise(|| ErrorKind::DownloadFailure(key.to_string()))?;
        }
        Ok(())
    }

    /// Parse a cached descriptor. One that does not parse is removed so the
    /// next load fetches it again.
    async fn read_descriptor(&self, repo: RepoType) -> Result<Descriptor> {
        let path = self.descriptor_path(repo);
        let xml = fs::read_to_string(&path).await.or_raise(|| ErrorKind::Cache(path.clone()))?;
        match Descriptor::parse(&xml) {
            Ok(descriptor) => Ok(descriptor),
            Err(e) => {
                _ = fs::remove_file(&path).await;
                Err(e)
            },
        }
    }
}
