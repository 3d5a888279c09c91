//! Reconciliation engine.
//!
//! Walks the site registry one site at a time: fetch the statistics snapshot,
//! match every user, group and plugin against the baseline, then insert or
//! update it. All writes of one site share a transaction, so a failing site
//! leaves no trace and never blocks the rest of the fleet.

mod baseline;

pub use baseline::Baseline;

use sqlx::SqliteConnection;

use crate::db::{self, Repository};
use crate::errors::SyncError;
use crate::fetch::{has_http_scheme, normalize_address, SnapshotFetcher};
use crate::models::{Site, Snapshot};

/// Inserts and updates issued for one entity kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl std::iter::Sum for WriteCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| Self {
            inserted: acc.inserted + c.inserted,
            updated: acc.updated + c.updated,
        })
    }
}

/// Writes committed for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOutcome {
    pub site_id: i64,
    pub address: String,
    pub users: WriteCounts,
    pub groups: WriteCounts,
    pub plugins: WriteCounts,
}

/// A site skipped during the run.
#[derive(Debug)]
pub struct SiteFailure {
    pub address: String,
    pub error: SyncError,
}

/// Summary of one batch run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub sites_total: usize,
    pub committed: Vec<SiteOutcome>,
    pub failures: Vec<SiteFailure>,
}

impl SyncReport {
    pub fn users(&self) -> WriteCounts {
        self.committed.iter().map(|s| s.users).sum()
    }

    pub fn groups(&self) -> WriteCounts {
        self.committed.iter().map(|s| s.groups).sum()
    }

    pub fn plugins(&self) -> WriteCounts {
        self.committed.iter().map(|s| s.plugins).sum()
    }
}

/// Sequential fetch-and-reconcile driver over the whole site registry.
pub struct Synchronizer {
    repo: Repository,
    fetcher: SnapshotFetcher,
}

impl Synchronizer {
    pub fn new(repo: Repository, fetcher: SnapshotFetcher) -> Self {
        Self { repo, fetcher }
    }

    /// Reconcile every registered site.
    ///
    /// Per-site failures are collected in the report; only store and commit
    /// failures abort the run.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let sites = self.repo.list_sites().await?;
        let total = sites.len();
        tracing::info!("Got {} addresses", total);

        let baseline = Baseline::load(&self.repo).await?;

        let mut report = SyncReport {
            sites_total: total,
            ..Default::default()
        };

        for (index, site) in sites.iter().enumerate() {
            let position = index + 1;
            if !has_http_scheme(&site.address) {
                tracing::info!(
                    "[{}/{}] Address '{}' does not contain HTTP or HTTPS, adding HTTP as default",
                    position,
                    total,
                    site.address
                );
            }
            tracing::info!(
                "[{}/{}] Retrieving stats for '{}'",
                position,
                total,
                normalize_address(&site.address)
            );

            let result = match self.fetcher.fetch(&site.address).await {
                Ok(snapshot) => self.reconcile_site(&baseline, site, &snapshot).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) => report.committed.push(outcome),
                Err(e) if e.is_fatal() => {
                    tracing::error!("[{}/{}] Aborting run: {}", position, total, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("[{}/{}] Skipping site: {}", position, total, e);
                    report.failures.push(SiteFailure {
                        address: site.address.clone(),
                        error: e,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Write one site's snapshot inside a single transaction.
    ///
    /// Any error after the transaction opens rolls it back before returning.
    pub async fn reconcile_site(
        &self,
        baseline: &Baseline,
        site: &Site,
        snapshot: &Snapshot,
    ) -> Result<SiteOutcome, SyncError> {
        tracing::info!(
            "Inserting data for '{}' ({} entries)...",
            site.address,
            snapshot.len()
        );

        let site_id = self
            .repo
            .find_site_id(&site.address)
            .await?
            .ok_or_else(|| SyncError::SiteResolution {
                address: site.address.clone(),
            })?;
        if site_id != site.id {
            tracing::warn!(
                "Address '{}' now resolves to site {} instead of {}",
                site.address,
                site_id,
                site.id
            );
        }

        let mut tx = self.repo.begin().await?;

        let outcome = match apply_snapshot(&mut *tx, baseline, site_id, &site.address, snapshot).await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!("Rollback failed for '{}': {}", site.address, rollback);
                }
                return Err(e);
            }
        };

        tx.commit().await.map_err(|e| {
            SyncError::StoreUnavailable(format!(
                "Failed to commit data for '{}': {}",
                site.address, e
            ))
        })?;

        tracing::info!(
            "Committed '{}' (site {}): users {} new / {} updated, groups {} new / {} updated, plugins {} new / {} updated",
            site.address,
            outcome.site_id,
            outcome.users.inserted,
            outcome.users.updated,
            outcome.groups.inserted,
            outcome.groups.updated,
            outcome.plugins.inserted,
            outcome.plugins.updated
        );
        Ok(outcome)
    }
}

/// Issue exactly one insert or update per snapshot entry.
async fn apply_snapshot(
    conn: &mut SqliteConnection,
    baseline: &Baseline,
    site_id: i64,
    address: &str,
    snapshot: &Snapshot,
) -> Result<SiteOutcome, SyncError> {
    let write_err = |e| SyncError::write(address, e);
    let mut outcome = SiteOutcome {
        site_id,
        address: address.to_string(),
        users: WriteCounts::default(),
        groups: WriteCounts::default(),
        plugins: WriteCounts::default(),
    };

    for user in &snapshot.users {
        let record = user.normalize(site_id);
        match baseline.match_user(&record.key()) {
            Some(id) => {
                db::update_user(&mut *conn, id, &record)
                    .await
                    .map_err(write_err)?;
                outcome.users.updated += 1;
            }
            None => {
                db::insert_user(&mut *conn, &record)
                    .await
                    .map_err(write_err)?;
                outcome.users.inserted += 1;
            }
        }
    }
    tracing::debug!("'{}' users: {:?}", address, outcome.users);

    for group in &snapshot.groups {
        let record = group.normalize(site_id);
        match baseline.match_group(&record.key()) {
            Some(id) => {
                db::update_group(&mut *conn, id, &record)
                    .await
                    .map_err(write_err)?;
                outcome.groups.updated += 1;
            }
            None => {
                db::insert_group(&mut *conn, &record)
                    .await
                    .map_err(write_err)?;
                outcome.groups.inserted += 1;
            }
        }
    }
    tracing::debug!("'{}' groups: {:?}", address, outcome.groups);

    for plugin in &snapshot.plugins {
        let record = plugin.normalize(site_id);
        match baseline.match_plugin(&record.key()) {
            Some(id) => {
                db::update_plugin(&mut *conn, id, &record)
                    .await
                    .map_err(write_err)?;
                outcome.plugins.updated += 1;
            }
            None => {
                db::insert_plugin(&mut *conn, &record)
                    .await
                    .map_err(write_err)?;
                outcome.plugins.inserted += 1;
            }
        }
    }
    tracing::debug!("'{}' plugins: {:?}", address, outcome.plugins);

    Ok(outcome)
}
