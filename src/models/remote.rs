//! Persisted remote entities and their natural keys.

/// Homepage stored for plugins that do not advertise one.
pub const NO_HOMEPAGE: &str = "No homepage";

/// A user account reported by a remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub id: i64,
    pub sites_id: i64,
    pub remote_uid: i64,
    pub username: String,
    pub fullname: String,
}

/// A group reported by a remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteGroup {
    pub id: i64,
    pub sites_id: i64,
    pub remote_gid: i64,
    pub name: String,
}

/// A plugin installed on a remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlugin {
    pub id: i64,
    pub sites_id: i64,
    pub name: String,
    pub version: String,
    pub homepage: String,
}

/// Identifies "the same user" across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub sites_id: i64,
    pub username: String,
    pub remote_uid: i64,
}

/// Identifies "the same group" across runs. The remote gid is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub sites_id: i64,
    pub name: String,
}

/// Identifies "the same plugin" across runs. A version bump is a new plugin row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginKey {
    pub sites_id: i64,
    pub name: String,
    pub version: String,
}

impl RemoteUser {
    pub fn key(&self) -> UserKey {
        UserKey {
            sites_id: self.sites_id,
            username: self.username.clone(),
            remote_uid: self.remote_uid,
        }
    }
}

impl RemoteGroup {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            sites_id: self.sites_id,
            name: self.name.clone(),
        }
    }
}

impl RemotePlugin {
    pub fn key(&self) -> PluginKey {
        PluginKey {
            sites_id: self.sites_id,
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// Normalized incoming user, ready to be inserted or to update a stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub sites_id: i64,
    pub remote_uid: i64,
    pub username: String,
    pub fullname: String,
}

/// Normalized incoming group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub sites_id: i64,
    pub remote_gid: i64,
    pub name: String,
}

/// Normalized incoming plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    pub sites_id: i64,
    pub name: String,
    pub version: String,
    pub homepage: String,
}

impl UserRecord {
    pub fn key(&self) -> UserKey {
        UserKey {
            sites_id: self.sites_id,
            username: self.username.clone(),
            remote_uid: self.remote_uid,
        }
    }
}

impl GroupRecord {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            sites_id: self.sites_id,
            name: self.name.clone(),
        }
    }
}

impl PluginRecord {
    pub fn key(&self) -> PluginKey {
        PluginKey {
            sites_id: self.sites_id,
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}
