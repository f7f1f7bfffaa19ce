//! Repository identity and the fixed set of metadata databases.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// Which tree of the repository a database describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RepoType {
    Bin,
    Src,
}
impl RepoType {
    pub const ALL: [RepoType; 2] = [RepoType::Bin, RepoType::Src];

    /// Path of this tree below `{uri}/{version}`.
    pub fn suburl(&self) -> &'static str {
        match self {
            RepoType::Bin => "clear/x86_64/os",
            RepoType::Src => "clear/source/SRPMS",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepoType::Bin => "bin",
            RepoType::Src => "src",
        }
    }
}
impl Display for RepoType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Logical name of a metadata database within one tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DbName {
    Filelists,
    Other,
    Primary,
}
impl DbName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbName::Filelists => "filelists",
            DbName::Other => "other",
            DbName::Primary => "primary",
        }
    }

    /// The `type` a repomd descriptor gives the SQLite flavour of this database.
    pub fn descriptor_type(&self) -> String {
        format!("{}_db", self.as_str())
    }
}
impl Display for DbName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One of the six metadata databases, e.g. `bin-primary`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbKey {
    pub repo: RepoType,
    pub name: DbName,
}
impl DbKey {
    pub const ALL: [DbKey; 6] = [
        DbKey::new(RepoType::Bin, DbName::Filelists),
        DbKey::new(RepoType::Bin, DbName::Other),
        DbKey::new(RepoType::Bin, DbName::Primary),
        DbKey::new(RepoType::Src, DbName::Filelists),
        DbKey::new(RepoType::Src, DbName::Other),
        DbKey::new(RepoType::Src, DbName::Primary),
    ];
    pub const BIN_FILELISTS: DbKey = DbKey::new(RepoType::Bin, DbName::Filelists);
    pub const BIN_PRIMARY: DbKey = DbKey::new(RepoType::Bin, DbName::Primary);
    pub const SRC_PRIMARY: DbKey = DbKey::new(RepoType::Src, DbName::Primary);

    pub const fn new(repo: RepoType, name: DbName) -> Self {
        Self { repo, name }
    }
}
impl Display for DbKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}", self.repo, self.name)
    }
}

/// One value per metadata database, addressed by [`DbKey`].
///
/// Lookups are an exhaustive match, so every key always has a value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DbMap<T> {
    bin_filelists: T,
    bin_other: T,
    bin_primary: T,
    src_filelists: T,
    src_other: T,
    src_primary: T,
}
impl<T> DbMap<T> {
    pub fn get(&self, key: DbKey) -> &T {
        match (key.repo, key.name) {
            (RepoType::Bin, DbName::Filelists) => &self.bin_filelists,
            (RepoType::Bin, DbName::Other) => &self.bin_other,
            (RepoType::Bin, DbName::Primary) => &self.bin_primary,
            (RepoType::Src, DbName::Filelists) => &self.src_filelists,
            (RepoType::Src, DbName::Other) => &self.src_other,
            (RepoType::Src, DbName::Primary) => &self.src_primary,
        }
    }

    pub fn get_mut(&mut self, key: DbKey) -> &mut T {
        match (key.repo, key.name) {
            (RepoType::Bin, DbName::Filelists) => &mut self.bin_filelists,
            (RepoType::Bin, DbName::Other) => &mut self.bin_other,
            (RepoType::Bin, DbName::Primary) => &mut self.bin_primary,
            (RepoType::Src, DbName::Filelists) => &mut self.src_filelists,
            (RepoType::Src, DbName::Other) => &mut self.src_other,
            (RepoType::Src, DbName::Primary) => &mut self.src_primary,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DbKey, &T)> {
        DbKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }

    /// Convert every value, stopping at the first error.
    pub fn try_map<U, E>(self, mut f: impl FnMut(DbKey, T) -> Result<U, E>) -> Result<DbMap<U>, E> {
        Ok(DbMap {
            bin_filelists: f(DbKey::new(RepoType::Bin, DbName::Filelists), self.bin_filelists)?,
            bin_other: f(DbKey::new(RepoType::Bin, DbName::Other), self.bin_other)?,
            bin_primary: f(DbKey::new(RepoType::Bin, DbName::Primary), self.bin_primary)?,
            src_filelists: f(DbKey::new(RepoType::Src, DbName::Filelists), self.src_filelists)?,
            src_other: f(DbKey::new(RepoType::Src, DbName::Other), self.src_other)?,
            src_primary: f(DbKey::new(RepoType::Src, DbName::Primary), self.src_primary)?,
        })
    }
}

/// Version string of the floating snapshot whose cache is never trusted.
pub const FLOATING_VERSION: &str = "mash";

/// A repository release: where it is published and where its metadata is
/// cached locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    uri: String,
    version: String,
    cache_root: PathBuf,
}
impl Repository {
    pub fn new(uri: impl Into<String>, version: impl Into<String>, cache_root: impl Into<PathBuf>) -> Self {
        let uri = uri.into().trim_end_matches('/').to_string();
        Self { uri, version: version.into(), cache_root: cache_root.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Whether this is the floating snapshot, which is refetched on every load.
    pub fn is_floating(&self) -> bool {
        self.version == FLOATING_VERSION
    }

    /// `{cache_root}/{version}/db`
    pub fn db_dir(&self) -> PathBuf {
        self.cache_root.join(&self.version).join("db")
    }

    /// `{cache_root}/{version}/db/{repo}-{name}`
    pub fn db_path(&self, key: DbKey) -> PathBuf {
        self.db_dir().join(key.to_string())
    }

    /// `{uri}/{version}/{suburl}/repodata/repomd.xml`
    pub fn descriptor_url(&self, repo: RepoType) -> String {
        self.tree_url(repo, "repodata/repomd.xml")
    }

    /// Local copy of a tree's descriptor, next to the databases.
    pub fn descriptor_path(&self, repo: RepoType) -> PathBuf {
        self.db_dir().join(format!("{repo}-repomd.xml"))
    }

    /// Download location of a file referenced by a tree's descriptor.
    pub fn tree_url(&self, repo: RepoType, href: &str) -> String {
        format!("{}/{}/{}/{}", self.uri, self.version, repo.suburl(), href.trim_start_matches('/'))
    }
}
