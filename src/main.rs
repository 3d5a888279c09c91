//! Site Statistics Sync
//!
//! Batch job that collects user, group and plugin statistics from every
//! registered remote site and reconciles them into the central SQLite store.

mod config;
mod db;
mod errors;
mod fetch;
mod models;
mod sync;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, DatabaseConfig};
use db::Repository;
use errors::SyncError;
use fetch::SnapshotFetcher;
use sync::{SyncReport, Synchronizer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting site statistics sync");
    tracing::info!("Configuration directory: {:?}", config.config_dir);

    match run(&config).await {
        Ok(report) => {
            log_summary(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sync aborted: {}", e);
            Err(e.into())
        }
    }
}

/// Connect to the store and reconcile every registered site.
async fn run(config: &Config) -> Result<SyncReport, SyncError> {
    let db_config = DatabaseConfig::load_dir(&config.config_dir)?;
    tracing::info!(
        "Connecting to {} database {:?} ({}@{}:{})",
        db_config.db_type,
        db_config.database,
        db_config.user,
        db_config.host,
        db_config.port
    );

    let pool = db::connect(&db_config).await?;
    tracing::info!("Connection to database established");
    db::ensure_schema(&pool).await?;

    let synchronizer = Synchronizer::new(Repository::new(pool.clone()), SnapshotFetcher::new());
    let report = synchronizer.run().await;

    pool.close().await;
    report
}

fn log_summary(report: &SyncReport) {
    let users = report.users();
    let groups = report.groups();
    let plugins = report.plugins();

    tracing::info!(
        "Data received. {} of {} sites committed, {} skipped",
        report.committed.len(),
        report.sites_total,
        report.failures.len()
    );
    tracing::info!(
        "Users: {} inserted, {} updated; groups: {} inserted, {} updated; plugins: {} inserted, {} updated",
        users.inserted,
        users.updated,
        groups.inserted,
        groups.updated,
        plugins.inserted,
        plugins.updated
    );
    for failure in &report.failures {
        tracing::warn!("Skipped '{}': {}", failure.address, failure.error);
    }
}
