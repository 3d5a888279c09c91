//! Database repository for the site registry and remote entity tables.
//!
//! Reads go through the shared pool. Writes take a connection so they run
//! inside the caller's per-site transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::errors::SyncError;
use crate::models::{
    GroupRecord, PluginRecord, RemoteGroup, RemotePlugin, RemoteUser, Site, UserRecord,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a transaction on the shared connection.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, SyncError> {
        Ok(self.pool.begin().await?)
    }

    // ==================== SITE REGISTRY ====================

    /// List all registered sites.
    pub async fn list_sites(&self) -> Result<Vec<Site>, SyncError> {
        let rows = sqlx::query("SELECT id, address FROM sites ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(site_from_row).collect())
    }

    /// Find a site id by its exact registered address.
    pub async fn find_site_id(&self, address: &str) -> Result<Option<i64>, SyncError> {
        let row = sqlx::query("SELECT id FROM sites WHERE address = ? ORDER BY id LIMIT 1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("id")))
    }

    // ==================== BASELINE READS ====================

    /// List every stored remote user, in insertion order.
    pub async fn list_remote_users(&self) -> Result<Vec<RemoteUser>, SyncError> {
        let rows = sqlx::query(
            "SELECT id, sites_id, remote_uid, username, fullname FROM remote_users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// List every stored remote group, in insertion order.
    pub async fn list_remote_groups(&self) -> Result<Vec<RemoteGroup>, SyncError> {
        let rows =
            sqlx::query("SELECT id, sites_id, remote_gid, name FROM remote_groups ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    /// List every stored remote plugin, in insertion order.
    pub async fn list_remote_plugins(&self) -> Result<Vec<RemotePlugin>, SyncError> {
        let rows = sqlx::query(
            "SELECT id, sites_id, name, version, homepage FROM remote_plugins ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(plugin_from_row).collect())
    }
}

// ==================== TRANSACTIONAL WRITES ====================

pub async fn insert_user(conn: &mut SqliteConnection, user: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO remote_users (sites_id, remote_uid, username, fullname) VALUES (?, ?, ?, ?)",
    )
    .bind(user.sites_id)
    .bind(user.remote_uid)
    .bind(&user.username)
    .bind(&user.fullname)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_user(
    conn: &mut SqliteConnection,
    id: i64,
    user: &UserRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE remote_users SET sites_id = ?, remote_uid = ?, username = ?, fullname = ? WHERE id = ?",
    )
    .bind(user.sites_id)
    .bind(user.remote_uid)
    .bind(&user.username)
    .bind(&user.fullname)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_group(
    conn: &mut SqliteConnection,
    group: &GroupRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO remote_groups (sites_id, remote_gid, name) VALUES (?, ?, ?)")
        .bind(group.sites_id)
        .bind(group.remote_gid)
        .bind(&group.name)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn update_group(
    conn: &mut SqliteConnection,
    id: i64,
    group: &GroupRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE remote_groups SET sites_id = ?, remote_gid = ?, name = ? WHERE id = ?")
        .bind(group.sites_id)
        .bind(group.remote_gid)
        .bind(&group.name)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_plugin(
    conn: &mut SqliteConnection,
    plugin: &PluginRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO remote_plugins (sites_id, name, version, homepage) VALUES (?, ?, ?, ?)",
    )
    .bind(plugin.sites_id)
    .bind(&plugin.name)
    .bind(&plugin.version)
    .bind(&plugin.homepage)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_plugin(
    conn: &mut SqliteConnection,
    id: i64,
    plugin: &PluginRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE remote_plugins SET sites_id = ?, name = ?, version = ?, homepage = ? WHERE id = ?",
    )
    .bind(plugin.sites_id)
    .bind(&plugin.name)
    .bind(&plugin.version)
    .bind(&plugin.homepage)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

// Helper functions for row conversion

fn site_from_row(row: &SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        address: row.get("address"),
    }
}

fn user_from_row(row: &SqliteRow) -> RemoteUser {
    let fullname: Option<String> = row.get("fullname");
    RemoteUser {
        id: row.get("id"),
        sites_id: row.get("sites_id"),
        remote_uid: row.get("remote_uid"),
        username: row.get("username"),
        fullname: fullname.unwrap_or_default(),
    }
}

fn group_from_row(row: &SqliteRow) -> RemoteGroup {
    RemoteGroup {
        id: row.get("id"),
        sites_id: row.get("sites_id"),
        remote_gid: row.get("remote_gid"),
        name: row.get("name"),
    }
}

fn plugin_from_row(row: &SqliteRow) -> RemotePlugin {
    let homepage: Option<String> = row.get("homepage");
    RemotePlugin {
        id: row.get("id"),
        sites_id: row.get("sites_id"),
        name: row.get("name"),
        version: row.get("version"),
        homepage: homepage.unwrap_or_default(),
    }
}
