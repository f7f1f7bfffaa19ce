//! Read-only connections to cached metadata databases.

use crate::error::{ErrorKind, Result};
use crate::repo::DbKey;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::instrument;

/// Queries are awaited one at a time, so a single connection is enough.
const MAX_CONNECTIONS: u32 = 1;

/// An opened metadata database.
#[derive(Debug, Clone)]
pub struct Database {
    key: DbKey,
    pool: SqlitePool,
}

impl Database {
    /// Open an existing database file for reading.
    ///
    /// Fails with [`ErrorKind::Corrupt`] when the file exists but is not a
    /// SQLite database, or is a damaged one: a query against the schema runs
    /// before the handle is returned, so a truncated or garbage download is
    /// caught here rather than on first use. Any other failure (a missing
    /// file, which is never created, or one that cannot be read at all) is
    /// [`ErrorKind::Database`].
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(key: DbKey, path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .read_only(true)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| classify(key, e))?;
        let db = Self { key, pool };
        if let Err(e) = db.check_readable().await {
            db.close().await;
            return Err(e);
        }
        Ok(db)
    }

    async fn check_readable(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("select count(*) from sqlite_master")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(self.key, e))?;
        Ok(())
    }

    pub fn key(&self) -> DbKey {
        self.key
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection. The handle must not be used afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `SQLITE_CORRUPT` and `SQLITE_NOTADB`.
const CORRUPT_CODES: [i32; 2] = [11, 26];

/// Whether `err` says the file is not (or no longer) a SQLite database.
fn is_corrupt(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    // Extended result codes carry the primary code in the low byte.
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| CORRUPT_CODES.contains(&(code & 0xff)))
}

fn classify(key: DbKey, err: sqlx::Error) -> crate::error::Error {
    let kind = if is_corrupt(&err) {
        ErrorKind::Corrupt(key.to_string())
    } else {
        ErrorKind::Database(key.to_string())
    };
    exn::Exn::new(err).raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[tokio::test]
    async fn test_open_existing_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bin-primary");
        fixture::write_database(&path, fixture::BIN_PRIMARY).await;
        let db = Database::open(DbKey::BIN_PRIMARY, &path).await.unwrap();
        assert_eq!(db.key(), DbKey::BIN_PRIMARY);
        let count: i64 = sqlx::query_scalar("select count(*) from packages").fetch_one(db.pool()).await.unwrap();
        assert!(count > 0);
        db.close().await;
    }

    #[tokio::test]
    async fn test_missing_file_is_not_created() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("src-other");
        let err = Database::open(DbKey::new(crate::RepoType::Src, crate::DbName::Other), &path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database("src-other".to_string()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_garbage_file_is_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bin-primary");
        std::fs::write(&path, b"<html>502 Bad Gateway</html>").unwrap();
        let err = Database::open(DbKey::BIN_PRIMARY, &path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt("bin-primary".to_string()));
    }

    #[tokio::test]
    async fn test_directory_is_not_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bin-primary");
        std::fs::create_dir(&path).unwrap();
        let err = Database::open(DbKey::BIN_PRIMARY, &path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database("bin-primary".to_string()));
    }

    #[test]
    fn test_only_database_errors_are_corrupt() {
        assert!(!is_corrupt(&sqlx::Error::PoolTimedOut));
        assert!(!is_corrupt(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn test_read_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bin-primary");
        fixture::write_database(&path, fixture::BIN_PRIMARY).await;
        let db = Database::open(DbKey::BIN_PRIMARY, &path).await.unwrap();
        assert!(sqlx::query("delete from packages").execute(db.pool()).await.is_err());
        db.close().await;
    }
}
