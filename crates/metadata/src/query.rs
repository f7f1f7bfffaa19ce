//! Package and capability queries over the six metadata databases.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRow, PackageFile};
use crate::repo::{DbKey, DbMap};
use crate::{Database, MetadataSet};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use rpmorder_graph::CapabilityIndex;
use rpmorder_graph::error::{ErrorKind as GraphErrorKind, Result as GraphResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::instrument;

/// Older SQLite builds cap a statement at 999 bound parameters.
const MAX_BIND_PARAMETERS: usize = 500;
/// Files under this directory count as provides when looking for duplicates.
const BINARY_DIR: &str = "/usr/bin";

/// Capability name to the source packages that provide it.
pub type DuplicateProviders = BTreeMap<String, BTreeSet<String>>;

/// Read-only queries over a loaded [`MetadataSet`].
///
/// "Source package" names come from the source tree's primary database;
/// binary packages link back to their source through `rpm_sourcerpm`, which
/// holds the source package's `location_href`.
#[derive(Debug, Clone)]
pub struct PackageIndex {
    dbs: MetadataSet,
}
impl From<MetadataSet> for PackageIndex {
    fn from(dbs: MetadataSet) -> Self {
        Self { dbs }
    }
}

impl PackageIndex {
    pub fn new(dbs: MetadataSet) -> Self {
        Self { dbs }
    }

    pub fn databases(&self) -> &DbMap<Database> {
        &self.dbs
    }

    /// Close every database connection.
    pub async fn close(self) {
        for (_, db) in self.dbs.iter() {
            db.close().await;
        }
    }

    fn pool(&self, key: DbKey) -> &SqlitePool {
        self.dbs.get(key).pool()
    }

    fn failed(key: DbKey) -> impl FnOnce() -> ErrorKind {
        move || ErrorKind::Database(key.to_string())
    }

    /// Run `head (?, ?, ...) tail` over `values`, at most
    /// [`MAX_BIND_PARAMETERS`] at a time. `head` must end inside an `IN (`.
    async fn fetch_chunked<T>(&self, key: DbKey, head: &str, tail: &str, values: &[String]) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut rows = Vec::new();
        for chunk in values.chunks(MAX_BIND_PARAMETERS) {
            let mut builder = QueryBuilder::<Sqlite>::new(head);
            let mut list = builder.separated(", ");
            for value in chunk {
                list.push_bind(value.as_str());
            }
            list.push_unseparated(")");
            builder.push(tail);
            let batch: Vec<T> =
                builder.build_query_as().fetch_all(self.pool(key)).await.or_raise(Self::failed(key))?;
            rows.extend(batch);
        }
        Ok(rows)
    }

    // =========================================================================
    // Source/binary linkage
    // =========================================================================

    /// `location_href` of source package `name`.
    pub async fn source_location(&self, name: &str) -> Result<String> {
        let location: Option<String> = sqlx::query_scalar(include_str!("../queries/source_location.sql"))
            .bind(name)
            .fetch_optional(self.pool(DbKey::SRC_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::SRC_PRIMARY))?;
        location.ok_or_raise(|| ErrorKind::PackageNotFound(name.to_string()))
    }

    /// Names of the binary packages built from source package `name`.
    pub async fn binary_subpackages(&self, name: &str) -> Result<BTreeSet<String>> {
        let location = self.source_location(name).await?;
        let names: Vec<String> = sqlx::query_scalar(include_str!("../queries/binary_subpackages.sql"))
            .bind(location)
            .fetch_all(self.pool(DbKey::BIN_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::BIN_PRIMARY))?;
        Ok(names.into_iter().collect())
    }

    async fn source_package_key(&self, name: &str) -> Result<i64> {
        let key: Option<i64> = sqlx::query_scalar(include_str!("../queries/source_package_key.sql"))
            .bind(name)
            .fetch_optional(self.pool(DbKey::SRC_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::SRC_PRIMARY))?;
        key.ok_or_raise(|| ErrorKind::PackageNotFound(name.to_string()))
    }

    /// Name of the source package that produced binary package `key`.
    async fn source_name_of_binary(&self, key: i64) -> Result<String> {
        let location: Option<Option<String>> = sqlx::query_scalar(include_str!("../queries/binary_source_rpm.sql"))
            .bind(key)
            .fetch_optional(self.pool(DbKey::BIN_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::BIN_PRIMARY))?;
        let location = location
            .flatten()
            .ok_or_raise(|| ErrorKind::PackageNotFound(format!("binary package key {key}")))?;
        let name: Option<String> = sqlx::query_scalar(include_str!("../queries/source_name_by_location.sql"))
            .bind(&location)
            .fetch_optional(self.pool(DbKey::SRC_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::SRC_PRIMARY))?;
        name.ok_or_raise(|| ErrorKind::PackageNotFound(location))
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Every binary package file whose directory contains `prefix`.
    ///
    /// Matching is a plain substring test on the directory, so `"/usr/bin"`
    /// also matches `/usr/bin/x86_64`. The test is case-sensitive: `"/USR/BIN"`
    /// matches nothing.
    pub async fn files_under_path(&self, prefix: &str) -> Result<Vec<PackageFile>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/files_under_path.sql"))
            .bind(prefix)
            .fetch_all(self.pool(DbKey::BIN_FILELISTS))
            .await
            .or_raise(Self::failed(DbKey::BIN_FILELISTS))?;
        Ok(rows.into_iter().flat_map(FileRow::into_files).collect())
    }

    /// Names of the binary packages owning a file matched by
    /// [`files_under_path`](Self::files_under_path).
    pub async fn packages_owning_path(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let ids: BTreeSet<String> = self.files_under_path(prefix).await?.into_iter().map(|f| f.pkg_id).collect();
        let ids: Vec<String> = ids.into_iter().collect();
        let rows: Vec<(String,)> = self
            .fetch_chunked(DbKey::BIN_PRIMARY, "SELECT name FROM packages WHERE pkgId IN (", " GROUP BY name", &ids)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Every capability required by any binary or source package.
    pub async fn all_required_capabilities(&self) -> Result<BTreeSet<String>> {
        let mut required = BTreeSet::new();
        for key in [DbKey::BIN_PRIMARY, DbKey::SRC_PRIMARY] {
            let names: Vec<String> = sqlx::query_scalar(include_str!("../queries/required_capabilities.sql"))
                .fetch_all(self.pool(key))
                .await
                .or_raise(Self::failed(key))?;
            required.extend(names);
        }
        Ok(required)
    }

    /// Every capability provided by a binary subpackage of source package `name`.
    pub async fn capabilities_provided_by(&self, name: &str) -> Result<BTreeSet<String>> {
        let location = self.source_location(name).await?;
        let names: Vec<String> = sqlx::query_scalar(include_str!("../queries/capabilities_provided_by.sql"))
            .bind(location)
            .fetch_all(self.pool(DbKey::BIN_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::BIN_PRIMARY))?;
        Ok(names.into_iter().collect())
    }

    /// Capabilities source package `name` needs in order to build.
    pub async fn build_requirements(&self, name: &str) -> Result<BTreeSet<String>> {
        let key = self.source_package_key(name).await?;
        let names: Vec<String> = sqlx::query_scalar(include_str!("../queries/build_requirements.sql"))
            .bind(key)
            .fetch_all(self.pool(DbKey::SRC_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::SRC_PRIMARY))?;
        Ok(names.into_iter().collect())
    }

    /// Source packages with a build requirement on any of `capabilities`.
    pub async fn packages_requiring<S: AsRef<str>>(&self, capabilities: &[S]) -> Result<BTreeSet<String>> {
        let capabilities: Vec<String> = capabilities.iter().map(|c| c.as_ref().to_string()).collect();
        let rows: Vec<(String,)> = self
            .fetch_chunked(
                DbKey::SRC_PRIMARY,
                concat!(
                    "SELECT DISTINCT packages.name FROM requires INNER JOIN packages USING (pkgKey) ",
                    "WHERE requires.name IN ("
                ),
                "",
                &capabilities,
            )
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Required capabilities with more than one provider.
    ///
    /// Candidates are the binary `provides` table plus every file under
    /// `/usr/bin`, each provided by the package shipping it. Only capabilities
    /// that something requires are considered. The first package key seen for
    /// a capability is remembered; every different key seen afterwards makes
    /// it a duplicate. Keys are reported as the names of the source packages
    /// that built them.
    #[instrument(skip(self))]
    pub async fn duplicate_providers(&self) -> Result<DuplicateProviders> {
        let required = self.all_required_capabilities().await?;
        let mut provides: Vec<(String, i64)> = sqlx::query_as(include_str!("../queries/all_provides.sql"))
            .fetch_all(self.pool(DbKey::BIN_PRIMARY))
            .await
            .or_raise(Self::failed(DbKey::BIN_PRIMARY))?;

        let mut paths_by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file in self.files_under_path(BINARY_DIR).await? {
            paths_by_id.entry(file.pkg_id).or_default().push(file.path);
        }
        let ids: Vec<String> = paths_by_id.keys().cloned().collect();
        let keys: Vec<(i64, String)> = self
            .fetch_chunked(DbKey::BIN_PRIMARY, "SELECT pkgKey, pkgId FROM packages WHERE pkgId IN (", "", &ids)
            .await?;
        for (key, id) in keys {
            if let Some(paths) = paths_by_id.get(&id) {
                provides.extend(paths.iter().map(|path| (path.clone(), key)));
            }
        }

        let mut first_provider: HashMap<&str, i64> = HashMap::new();
        let mut names: HashMap<i64, String> = HashMap::new();
        let mut duplicates = DuplicateProviders::new();
        for (capability, key) in &provides {
            if !required.contains(capability) {
                continue;
            }
            let first = *first_provider.entry(capability).or_insert(*key);
            if first == *key {
                continue;
            }
            let name = self.source_name_cached(*key, &mut names).await?;
            let first_name = if duplicates.contains_key(capability) {
                None
            } else {
                Some(self.source_name_cached(first, &mut names).await?)
            };
            let providers = duplicates.entry(capability.clone()).or_default();
            providers.insert(name);
            providers.extend(first_name);
        }
        tracing::debug!(duplicates = duplicates.len(), "checked for duplicate providers");
        Ok(duplicates)
    }

    async fn source_name_cached(&self, key: i64, names: &mut HashMap<i64, String>) -> Result<String> {
        if let Some(name) = names.get(&key) {
            return Ok(name.clone());
        }
        let name = self.source_name_of_binary(key).await?;
        names.insert(key, name.clone());
        Ok(name)
    }
}

#[async_trait]
impl CapabilityIndex for PackageIndex {
    async fn build_requirements(&self, pkg: &str) -> GraphResult<BTreeSet<String>> {
        PackageIndex::build_requirements(self, pkg).await.or_raise(|| GraphErrorKind::Lookup(pkg.to_string()))
    }

    async fn capabilities_provided_by(&self, pkg: &str) -> GraphResult<BTreeSet<String>> {
        PackageIndex::capabilities_provided_by(self, pkg).await.or_raise(|| GraphErrorKind::Lookup(pkg.to_string()))
    }
}
