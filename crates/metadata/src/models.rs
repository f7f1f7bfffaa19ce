/// A file shipped by a binary package, identified by the package's content id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageFile {
    pub path: String,
    pub pkg_id: String,
}

/// One `filelist` row: every file of a package in a single directory.
///
/// `filenames` packs the directory's entries into one `/`-separated string;
/// it is not a path.
#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    dirname: String,
    filenames: String,
    pkg_id: String,
}
impl FileRow {
    pub(crate) fn into_files(self) -> impl Iterator<Item = PackageFile> {
        let Self { dirname, filenames, pkg_id } = self;
        let dir = dirname.trim_end_matches('/').to_string();
        filenames
            .split('/')
            .filter(|name| !name.is_empty())
            .map(|name| PackageFile { path: format!("{dir}/{name}"), pkg_id: pkg_id.clone() })
            .collect::<Vec<_>>()
            .into_iter()
    }
}
