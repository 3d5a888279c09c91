//! Configuration module for the site statistics reconciler.
//!
//! Process settings come from environment variables with sensible defaults.
//! Store connection parameters come from a directory of INI files holding a
//! `[database]` section. Values are read literally.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::errors::SyncError;

/// Section holding the store keys.
pub const DATABASE_SECTION: &str = "database";

/// Store keys that every configuration must provide.
pub const REQUIRED_KEYS: [&str; 6] = ["type", "user", "password", "host", "port", "database"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the `*conf` store configuration files
    pub config_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config_dir = env::var("SITE_STATS_CONFIG_DIR")
            .unwrap_or_else(|_| "./config".to_string())
            .into();

        let log_level = env::var("SITE_STATS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            config_dir,
            log_level,
        }
    }
}

/// Store connection parameters.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub db_type: String,
    pub user: String,
    /// Required like the other keys, but the SQLite backend has no login.
    #[allow(dead_code)]
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Path of the SQLite database file
    pub database: PathBuf,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("db_type", &self.db_type)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl DatabaseConfig {
    /// Read every file ending in `conf` under `dir`, in file-name order.
    ///
    /// Keys outside any section are read first, then the `[database]` section.
    /// Keys from later files override earlier ones.
    pub fn load_dir(dir: &Path) -> Result<Self, SyncError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            SyncError::Config(format!(
                "Cannot read configuration directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with("conf"))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SyncError::Config(format!(
                "No configuration files found in {}",
                dir.display()
            )));
        }

        let mut values = HashMap::new();
        for path in &files {
            tracing::debug!("Reading configuration from {}", path.display());
            let ini = Ini::load_from_file_noescape(path)?;
            for section in [None, Some(DATABASE_SECTION)] {
                if let Some(properties) = ini.section(section) {
                    for (key, value) in properties.iter() {
                        values.insert(key.to_lowercase(), value.to_string());
                    }
                }
            }
        }

        Self::from_values(&values)
    }

    /// Build the store configuration from already parsed key/value pairs.
    pub fn from_values(values: &HashMap<String, String>) -> Result<Self, SyncError> {
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !values.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::Config(format!(
                "Missing required configuration keys: {}",
                missing.join(", ")
            )));
        }

        let db_type = values["type"].trim().to_lowercase();
        if db_type != "sqlite" {
            return Err(SyncError::Config(format!(
                "Unsupported database type '{}'. Must be sqlite.",
                db_type
            )));
        }

        let port = values["port"].trim().parse::<u16>().map_err(|_| {
            SyncError::Config(format!("Invalid port '{}'", values["port"]))
        })?;

        let database = values["database"].trim();
        if database.is_empty() {
            return Err(SyncError::Config("database must not be empty".to_string()));
        }

        Ok(Self {
            db_type,
            user: values["user"].clone(),
            password: values["password"].clone(),
            host: values["host"].clone(),
            port,
            database: PathBuf::from(database),
        })
    }
}
