//! Match baseline: every remote row stored before the run, indexed by natural key.

use std::collections::HashMap;
use std::hash::Hash;

use crate::db::Repository;
use crate::errors::SyncError;
use crate::models::{GroupKey, PluginKey, RemoteGroup, RemotePlugin, RemoteUser, UserKey};

/// Read-only view of the stored remote rows used to choose insert or update.
///
/// Loaded once per run and not refreshed while sites are written, which is
/// safe because every natural key includes the site id.
#[derive(Debug, Default)]
pub struct Baseline {
    users: HashMap<UserKey, i64>,
    groups: HashMap<GroupKey, i64>,
    plugins: HashMap<PluginKey, i64>,
}

impl Baseline {
    /// Load all stored users, groups and plugins across all sites.
    pub async fn load(repo: &Repository) -> Result<Self, SyncError> {
        let users = repo.list_remote_users().await?;
        let groups = repo.list_remote_groups().await?;
        let plugins = repo.list_remote_plugins().await?;

        let baseline = Self::from_rows(&users, &groups, &plugins);
        tracing::info!(
            "Loaded baseline: {} users, {} groups, {} plugins",
            users.len(),
            groups.len(),
            plugins.len()
        );
        if baseline.is_empty() {
            tracing::info!("No stored remote rows yet, every entry will be inserted");
        }
        Ok(baseline)
    }

    /// Index rows by natural key. Rows must be in load order; the first row of
    /// a duplicated key wins.
    pub fn from_rows(users: &[RemoteUser], groups: &[RemoteGroup], plugins: &[RemotePlugin]) -> Self {
        Self {
            users: index(users.iter().map(|u| (u.key(), u.id))),
            groups: index(groups.iter().map(|g| (g.key(), g.id))),
            plugins: index(plugins.iter().map(|p| (p.key(), p.id))),
        }
    }

    /// Stored row id of the user with this key, if any.
    pub fn match_user(&self, key: &UserKey) -> Option<i64> {
        self.users.get(key).copied()
    }

    pub fn match_group(&self, key: &GroupKey) -> Option<i64> {
        self.groups.get(key).copied()
    }

    pub fn match_plugin(&self, key: &PluginKey) -> Option<i64> {
        self.plugins.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty() && self.plugins.is_empty()
    }
}

fn index<K: Hash + Eq>(rows: impl Iterator<Item = (K, i64)>) -> HashMap<K, i64> {
    let mut map = HashMap::new();
    for (key, id) in rows {
        map.entry(key).or_insert(id);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, sites_id: i64, username: &str, remote_uid: i64) -> RemoteUser {
        RemoteUser {
            id,
            sites_id,
            remote_uid,
            username: username.to_string(),
            fullname: username.to_string(),
        }
    }

    #[test]
    fn test_empty_baseline_never_matches() {
        let baseline = Baseline::default();
        assert!(baseline.is_empty());
        assert_eq!(
            baseline.match_user(&UserKey {
                sites_id: -1,
                username: String::new(),
                remote_uid: -1,
            }),
            None
        );
    }

    #[test]
    fn test_user_match_requires_full_key() {
        let baseline = Baseline::from_rows(&[user(10, 1, "bob", 7)], &[], &[]);

        let key = UserKey {
            sites_id: 1,
            username: "bob".into(),
            remote_uid: 7,
        };
        assert_eq!(baseline.match_user(&key), Some(10));

        let other_site = UserKey {
            sites_id: 2,
            ..key.clone()
        };
        assert_eq!(baseline.match_user(&other_site), None);

        let other_uid = UserKey {
            remote_uid: 8,
            ..key
        };
        assert_eq!(baseline.match_user(&other_uid), None);
    }

    #[test]
    fn test_first_row_wins_on_duplicate_key() {
        let baseline =
            Baseline::from_rows(&[user(3, 1, "bob", 7), user(9, 1, "bob", 7)], &[], &[]);
        let key = UserKey {
            sites_id: 1,
            username: "bob".into(),
            remote_uid: 7,
        };
        assert_eq!(baseline.match_user(&key), Some(3));
    }

    #[test]
    fn test_group_and_plugin_keys() {
        let groups = [RemoteGroup {
            id: 4,
            sites_id: 1,
            remote_gid: 100,
            name: "admins".into(),
        }];
        let plugins = [RemotePlugin {
            id: 5,
            sites_id: 1,
            name: "Poll".into(),
            version: "1.0".into(),
            homepage: "No homepage".into(),
        }];
        let baseline = Baseline::from_rows(&[], &groups, &plugins);

        // The remote gid is not part of the group key
        assert_eq!(
            baseline.match_group(&GroupKey {
                sites_id: 1,
                name: "admins".into()
            }),
            Some(4)
        );
        assert_eq!(
            baseline.match_plugin(&PluginKey {
                sites_id: 1,
                name: "Poll".into(),
                version: "1.0".into()
            }),
            Some(5)
        );
        assert_eq!(
            baseline.match_plugin(&PluginKey {
                sites_id: 1,
                name: "Poll".into(),
                version: "1.1".into()
            }),
            None
        );
    }
}
