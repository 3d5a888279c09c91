//! Registered remote site.

/// A remote instance tracked by the directory.
///
/// Sites are registered outside this tool; the reconciler only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: i64,
    pub address: String,
}
