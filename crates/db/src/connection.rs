use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use hanbot_core::ContentStore;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?;
    pool_options(max_connections, timeout_secs).connect_with(options).await
}

/// Opens a database file. The bot itself never creates files
/// (`create_if_missing = false`); only the operator `migrate` command does.
pub async fn connect_file(
    path: &Path,
    create_if_missing: bool,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(create_if_missing);
    pool_options(max_connections, timeout_secs).connect_with(options).await
}

fn pool_options(max_connections: u32, timeout_secs: u64) -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
}

/// Both database handles, opened once at startup and held for the process
/// lifetime.
#[derive(Clone, Debug)]
pub struct StoragePools {
    pub jokes: DbPool,
    pub functions: DbPool,
}

impl StoragePools {
    pub fn new(jokes: DbPool, functions: DbPool) -> Self {
        Self { jokes, functions }
    }

    /// Two independent single-connection in-memory databases.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let jokes = connect_with_settings("sqlite::memory:", 1, 30).await?;
        let functions = connect_with_settings("sqlite::memory:", 1, 30).await?;
        Ok(Self { jokes, functions })
    }

    pub fn pool(&self, store: ContentStore) -> &DbPool {
        match store {
            ContentStore::Jokes => &self.jokes,
            ContentStore::Functions => &self.functions,
        }
    }

    pub async fn close(&self) {
        self.jokes.close().await;
        self.functions.close().await;
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::connect_file;

    #[tokio::test]
    async fn connect_file_refuses_to_create_missing_database() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("missing.db");

        let result = connect_file(&path, false, 1, 5).await;

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn connect_file_creates_database_when_asked() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("created.db");

        let pool = connect_file(&path, true, 1, 5).await.expect("create database");
        pool.close().await;

        assert!(path.exists());
    }
}
