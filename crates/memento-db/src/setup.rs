//! Database setup and initialization.
//!
//! This module provides the `setup_database()` function for opening the
//! `SQLite` pool described by the settings. Tables are created per model
//! set by the stores themselves (`SqliteModelStore::ensure_table`).

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use memento_core::Settings;

/// Opens the `SQLite` connection pool described by `settings`.
///
/// This function:
/// 1. Parses the database URL (`effective_database_url`)
/// 2. Creates the parent directory and database file if missing
/// 3. Sizes the pool from `effective_max_connections`
///
/// # Errors
///
/// Returns an error if the URL is malformed or the database cannot be
/// opened or created.
///
/// # Example
///
/// ```rust,no_run
/// use memento_core::Settings;
/// use memento_db::setup_database;
///
/// # async fn example() -> anyhow::Result<()> {
/// let settings = Settings::from_env()?;
/// let pool = setup_database(&settings).await?;
/// # Ok(())
/// # }
/// ```
pub async fn setup_database(settings: &Settings) -> Result<SqlitePool> {
    let url = settings.effective_database_url();
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database URL {url}"))?
        .create_if_missing(true);

    // Ensure parent directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.effective_max_connections())
        .connect_with(options)
        .await?;

    info!(url, "Database ready");
    Ok(pool)
}

/// Sets up an in-memory `SQLite` database for testing.
///
/// The pool holds a single connection that never expires, so the database
/// lives as long as the pool.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memento.db");
        let settings = Settings {
            database_url: Some(format!("sqlite://{}", path.display())),
            ..Settings::with_defaults()
        };

        let pool = setup_database(&settings).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_setup_database_fails_when_parent_is_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().join("memento.db");
        let settings = Settings {
            database_url: Some(format!("sqlite://{}", path.display())),
            ..Settings::with_defaults()
        };
        assert!(setup_database(&settings).await.is_err());
    }

    #[tokio::test]
    async fn test_test_database_keeps_state() {
        let pool = setup_test_database().await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t VALUES (1)").execute(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
