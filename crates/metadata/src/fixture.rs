//! A small createrepo-shaped repository served from memory.
//!
//! Source packages and what their binaries provide:
//!
//! | source       | binaries                | notable provides / files                   |
//! |--------------|-------------------------|--------------------------------------------|
//! | `foo`        | `foo-lib`, `foo-dev`    | `libfoo.so.1`, `pkgconfig(foo)`            |
//! | `perl`       | `perl-bin`              | `perl(strict)`, `/usr/bin/perl`            |
//! | `gcc`        | `gcc-bin`               | `gcc`, `/usr/bin/gcc`                      |
//! | `app`        | `app-bin`               | `/usr/bin/app`                             |
//! | `bar`        | `bar-dev`               | `pkgconfig(bar)`                           |
//! | `bar-compat` | `bar-compat-dev`        | `pkgconfig(bar)` (listed twice)            |
//! | `bar-next`   | `bar-next-dev`          | `pkgconfig(bar)`                           |
//! | `busybox`    | `busybox-bin`           | ships a file at `/usr/bin/perl`            |

use crate::repo::{DbName, FLOATING_VERSION, RepoType, Repository};
use rpmorder_compress::Compression;
use rpmorder_fetch::retriever::MockRetriever;
use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use std::path::Path;
use tempfile::TempDir;

pub(crate) const URI: &str = "https://mirror.test/releases";
pub(crate) const VERSION: &str = "40000";

const PRIMARY_SCHEMA: &str = r#"
CREATE TABLE packages (
    pkgKey INTEGER PRIMARY KEY,
    pkgId TEXT,
    name TEXT,
    arch TEXT,
    version TEXT,
    release TEXT,
    location_href TEXT,
    rpm_sourcerpm TEXT
);
CREATE TABLE provides (name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER);
CREATE TABLE requires (
    name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER, pre BOOLEAN DEFAULT FALSE
);
CREATE INDEX packagename ON packages (name);
CREATE INDEX packageId ON packages (pkgId);
CREATE INDEX providesname ON provides (name);
CREATE INDEX requiresname ON requires (name);
"#;

const FILELISTS_SCHEMA: &str = r#"
CREATE TABLE packages (pkgKey INTEGER PRIMARY KEY, pkgId TEXT);
CREATE TABLE filelist (pkgKey INTEGER, dirname TEXT, filenames TEXT, filetypes TEXT);
CREATE INDEX keyfile ON filelist (pkgKey);
CREATE INDEX pkgId ON packages (pkgId);
CREATE INDEX dirnames ON filelist (dirname);
"#;

const OTHER_SCHEMA: &str = r#"
CREATE TABLE packages (pkgKey INTEGER PRIMARY KEY, pkgId TEXT);
CREATE TABLE changelog (pkgKey INTEGER, author TEXT, date INTEGER, changelog TEXT);
"#;

pub(crate) const SRC_PRIMARY: &str = r#"
INSERT INTO packages (pkgKey, pkgId, name, arch, version, release, location_href, rpm_sourcerpm) VALUES
    (1, 's-foo', 'foo', 'src', '1.0', '1', 'foo-1.0-1.src.rpm', NULL),
    (2, 's-perl', 'perl', 'src', '5.38', '1', 'perl-5.38-1.src.rpm', NULL),
    (3, 's-gcc', 'gcc', 'src', '13', '1', 'gcc-13-1.src.rpm', NULL),
    (4, 's-app', 'app', 'src', '2.0', '1', 'app-2.0-1.src.rpm', NULL),
    (5, 's-bar', 'bar', 'src', '1', '1', 'bar-1-1.src.rpm', NULL),
    (6, 's-bar-compat', 'bar-compat', 'src', '1', '1', 'bar-compat-1-1.src.rpm', NULL),
    (7, 's-busybox', 'busybox', 'src', '1.36', '1', 'busybox-1.36-1.src.rpm', NULL),
    (8, 's-bar-next', 'bar-next', 'src', '2', '1', 'bar-next-2-1.src.rpm', NULL);
INSERT INTO requires (name, pkgKey) VALUES
    ('gcc', 1), ('/usr/bin/perl', 1),
    ('gcc', 2),
    ('libfoo.so.1', 4), ('gcc', 4), ('pkgconfig(bar)', 4),
    ('gcc', 5),
    ('gcc', 6),
    ('gcc', 7);
INSERT INTO provides (name, pkgKey) VALUES
    ('foo', 1), ('perl', 2), ('gcc', 3), ('app', 4), ('bar', 5), ('bar-compat', 6), ('busybox', 7),
    ('bar-next', 8);
"#;

pub(crate) const BIN_PRIMARY: &str = r#"
INSERT INTO packages (pkgKey, pkgId, name, arch, version, release, location_href, rpm_sourcerpm) VALUES
    (10, 'p-foo-lib', 'foo-lib', 'x86_64', '1.0', '1', 'Packages/foo-lib-1.0-1.x86_64.rpm', 'foo-1.0-1.src.rpm'),
    (11, 'p-foo-dev', 'foo-dev', 'x86_64', '1.0', '1', 'Packages/foo-dev-1.0-1.x86_64.rpm', 'foo-1.0-1.src.rpm'),
    (12, 'p-perl', 'perl-bin', 'x86_64', '5.38', '1', 'Packages/perl-bin-5.38-1.x86_64.rpm', 'perl-5.38-1.src.rpm'),
    (13, 'p-gcc', 'gcc-bin', 'x86_64', '13', '1', 'Packages/gcc-bin-13-1.x86_64.rpm', 'gcc-13-1.src.rpm'),
    (14, 'p-app', 'app-bin', 'x86_64', '2.0', '1', 'Packages/app-bin-2.0-1.x86_64.rpm', 'app-2.0-1.src.rpm'),
    (15, 'p-bar', 'bar-dev', 'x86_64', '1', '1', 'Packages/bar-dev-1-1.x86_64.rpm', 'bar-1-1.src.rpm'),
    (16, 'p-bar-compat', 'bar-compat-dev', 'x86_64', '1', '1',
        'Packages/bar-compat-dev-1-1.x86_64.rpm', 'bar-compat-1-1.src.rpm'),
    (17, 'p-busybox', 'busybox-bin', 'x86_64', '1.36', '1',
        'Packages/busybox-bin-1.36-1.x86_64.rpm', 'busybox-1.36-1.src.rpm'),
    (18, 'p-bar-next', 'bar-next-dev', 'x86_64', '2', '1',
        'Packages/bar-next-dev-2-1.x86_64.rpm', 'bar-next-2-1.src.rpm');
INSERT INTO provides (name, flags, pkgKey) VALUES
    ('libfoo.so.1', NULL, 10), ('foo-lib', 'EQ', 10),
    ('foo-dev', 'EQ', 11), ('pkgconfig(foo)', 'EQ', 11),
    ('perl-bin', 'EQ', 12), ('perl(strict)', NULL, 12), ('/usr/bin/perl', NULL, 12),
    ('gcc', NULL, 13), ('gcc', 'EQ', 13), ('cpp', NULL, 13),
    ('app-bin', 'EQ', 14),
    ('pkgconfig(bar)', 'EQ', 15),
    ('pkgconfig(bar)', 'EQ', 16), ('pkgconfig(bar)', NULL, 16),
    ('busybox-bin', 'EQ', 17),
    ('pkgconfig(bar)', 'EQ', 18);
INSERT INTO requires (name, pkgKey) VALUES
    ('perl(strict)', 11),
    ('libfoo.so.1', 14), ('libc.so.6', 14);
"#;

pub(crate) const BIN_FILELISTS: &str = r#"
INSERT INTO packages (pkgKey, pkgId) VALUES
    (1, 'p-foo-lib'), (2, 'p-perl'), (3, 'p-gcc'), (4, 'p-app'), (5, 'p-busybox'), (6, 'p-foo-dev');
INSERT INTO filelist (pkgKey, dirname, filenames, filetypes) VALUES
    (1, '/usr/lib64', 'libfoo.so.1/libfoo.so.1.0', 'ff'),
    (2, '/usr/bin', 'perl/perldoc', 'ff'),
    (2, '/usr/share/perl5', 'strict.pm', 'f'),
    (3, '/usr/bin', 'gcc/cpp', 'ff'),
    (4, '/usr/bin', 'app', 'f'),
    (5, '/usr/bin', 'perl', 'f'),
    (6, '/usr/include/foo', 'foo.h', 'f');
"#;

const EMPTY: &str = "";

/// Create a SQLite database at `path` with the schema of `name` and `rows`.
pub(crate) async fn write_schema_and_rows(path: &Path, name: DbName, rows: &str) {
    let schema = match name {
        DbName::Filelists => FILELISTS_SCHEMA,
        DbName::Other => OTHER_SCHEMA,
        DbName::Primary => PRIMARY_SCHEMA,
    };
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    sqlx::raw_sql(schema).execute(&mut conn).await.unwrap();
    if !rows.is_empty() {
        sqlx::raw_sql(rows).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();
}

/// Create a primary database at `path` holding `rows`.
pub(crate) async fn write_database(path: &Path, rows: &str) {
    write_schema_and_rows(path, DbName::Primary, rows).await;
}

fn rows(repo: RepoType, name: DbName) -> &'static str {
    match (repo, name) {
        (RepoType::Bin, DbName::Primary) => BIN_PRIMARY,
        (RepoType::Bin, DbName::Filelists) => BIN_FILELISTS,
        (RepoType::Src, DbName::Primary) => SRC_PRIMARY,
        (_, _) => EMPTY,
    }
}

/// Binary tree databases are published as `.xz`, source tree as `.zst`.
pub(crate) fn compression(repo: RepoType) -> Compression {
    match repo {
        RepoType::Bin => Compression::Xz,
        RepoType::Src => Compression::Zstd,
    }
}

pub(crate) fn href(repo: RepoType, name: DbName) -> String {
    format!("repodata/0123abcd-{name}.sqlite{}", compression(repo).extension())
}

/// A descriptor listing `entries` as `(type, href)`, plus an XML-flavoured
/// entry that must be ignored.
pub(crate) fn repomd(entries: &[(String, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo"
        xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1700000000</revision>
  <data type="primary">
    <checksum type="sha256">ffff</checksum>
    <location href="repodata/ffff-primary.xml.gz"/>
  </data>
"#,
    );
    for (kind, href) in entries {
        xml.push_str(&format!(
            concat!(
                "  <data type=\"{}\">\n",
                "    <checksum type=\"sha256\">0123abcd</checksum>\n",
                "    <location href=\"{}\"/>\n",
                "  </data>\n",
            ),
            kind,
            href
        ));
    }
    xml.push_str("</repomd>\n");
    xml
}

fn full_repomd(repo: RepoType) -> String {
    let entries: Vec<(String, String)> = [DbName::Filelists, DbName::Other, DbName::Primary]
        .into_iter()
        .map(|n| (n.descriptor_type(), href(repo, n)))
        .collect();
    repomd(&entries)
}

/// A mirror publishing the fixture repository under [`VERSION`] and under the
/// floating version.
pub(crate) struct Mirror {
    pub temp_dir: TempDir,
    pub retriever: MockRetriever,
}

impl Mirror {
    pub(crate) async fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let build_dir = temp_dir.path().join("build");
        std::fs::create_dir_all(&build_dir).unwrap();
        let retriever = MockRetriever::default();
        for version in [VERSION, FLOATING_VERSION] {
            let published = Repository::new(URI, version, temp_dir.path().join("unused"));
            for repo in RepoType::ALL {
                retriever.insert(published.descriptor_url(repo), full_repomd(repo));
                for name in [DbName::Filelists, DbName::Other, DbName::Primary] {
                    let path = build_dir.join(format!("{version}-{repo}-{name}"));
                    write_schema_and_rows(&path, name, rows(repo, name)).await;
                    let compressed = compression(repo).compress(&std::fs::read(&path).unwrap()).unwrap();
                    retriever.insert(published.tree_url(repo, &href(repo, name)), compressed);
                }
            }
        }
        Self { temp_dir, retriever }
    }

    /// The repository as seen by a client caching under this mirror's temp dir.
    pub(crate) fn repository(&self, version: &str) -> Repository {
        Repository::new(URI, version, self.temp_dir.path().join("cache"))
    }
}
