//! Statistics document served by a remote site at `/main/statistics`.
//!
//! The document is deserialized as-is and only turned into store records by
//! the `normalize` methods, which apply the default-value policy.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::{GroupRecord, PluginRecord, UserRecord, NO_HOMEPAGE};

/// One site's statistics for one run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "entries")]
    pub users: Vec<SnapshotUser>,
    #[serde(default, deserialize_with = "entries")]
    pub groups: Vec<SnapshotGroup>,
    #[serde(default, deserialize_with = "entries")]
    pub plugins: Vec<SnapshotPlugin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotUser {
    #[serde(deserialize_with = "remote_id")]
    pub id: i64,
    pub nickname: String,
    #[serde(default)]
    pub fullname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotGroup {
    #[serde(deserialize_with = "remote_id")]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPlugin {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub homepage: Option<String>,
}

impl Snapshot {
    /// Number of entries across all three kinds.
    pub fn len(&self) -> usize {
        self.users.len() + self.groups.len() + self.plugins.len()
    }
}

impl SnapshotUser {
    /// Users without a full name are stored under their nickname.
    pub fn normalize(&self, sites_id: i64) -> UserRecord {
        UserRecord {
            sites_id,
            remote_uid: self.id,
            username: self.nickname.clone(),
            fullname: non_empty(self.fullname.as_deref())
                .unwrap_or(&self.nickname)
                .to_string(),
        }
    }
}

impl SnapshotGroup {
    pub fn normalize(&self, sites_id: i64) -> GroupRecord {
        GroupRecord {
            sites_id,
            remote_gid: self.id,
            name: self.name.clone(),
        }
    }
}

impl SnapshotPlugin {
    pub fn normalize(&self, sites_id: i64) -> PluginRecord {
        PluginRecord {
            sites_id,
            name: self.name.clone(),
            version: self.version.clone(),
            homepage: non_empty(self.homepage.as_deref())
                .unwrap_or(NO_HOMEPAGE)
                .to_string(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Sections are keyed objects, but an empty section may arrive as `[]`.
///
/// Keyed entries keep document order (`serde_json` is built with
/// `preserve_order`), so new rows are written in the order the site lists them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Entries<T> {
    Keyed(Map<String, Value>),
    Listed(Vec<T>),
}

fn entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Entries<T>>::deserialize(deserializer)? {
        Some(Entries::Keyed(map)) => map
            .into_iter()
            .map(|(_, entry)| serde_json::from_value(entry).map_err(D::Error::custom))
            .collect(),
        Some(Entries::Listed(list)) => Ok(list),
        None => Ok(Vec::new()),
    }
}

/// Remote ids are numbers, but some sites send them as numeric strings.
fn remote_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid remote id '{}'", s))),
    }
}
