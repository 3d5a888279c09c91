//! Database module for the central SQLite store.
//!
//! The store is the sole owner of sites and reconciled remote rows.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;
use crate::errors::SyncError;

/// Open the store connection.
///
/// The pool holds a single connection: sites are reconciled one at a time and
/// never share a transaction.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, SyncError> {
    // Ensure the parent directory exists
    if let Some(parent) = config.database.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.database)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| {
            SyncError::StoreUnavailable(format!(
                "Failed to connect to database {}: {}",
                config.database.display(),
                e
            ))
        })?;

    Ok(pool)
}

/// Create the store tables if they don't exist. Existing tables are left as is.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), SyncError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS remote_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sites_id INTEGER NOT NULL REFERENCES sites(id),
            remote_uid INTEGER NOT NULL,
            username TEXT NOT NULL,
            fullname TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS remote_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sites_id INTEGER NOT NULL REFERENCES sites(id),
            remote_gid INTEGER NOT NULL,
            name TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS remote_plugins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sites_id INTEGER NOT NULL REFERENCES sites(id),
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            homepage TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the registry lookup and per-site scans
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sites_address ON sites(address);
        CREATE INDEX IF NOT EXISTS idx_remote_users_sites_id ON remote_users(sites_id);
        CREATE INDEX IF NOT EXISTS idx_remote_groups_sites_id ON remote_groups(sites_id);
        CREATE INDEX IF NOT EXISTS idx_remote_plugins_sites_id ON remote_plugins(sites_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
