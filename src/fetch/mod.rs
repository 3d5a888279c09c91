//! Snapshot fetcher.
//!
//! Retrieves the statistics document of one remote site over HTTP(S). Every
//! failure is reported as a per-site `Fetch` error so the caller can skip the
//! site and carry on with the rest of the fleet.

use reqwest::Client;

use crate::errors::SyncError;
use crate::models::Snapshot;

/// Path of the statistics document on every remote site.
pub const STATISTICS_PATH: &str = "/main/statistics";

/// Whether the address already names the `http` or `https` scheme.
pub fn has_http_scheme(address: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        address
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Prefix `http://` to addresses registered without a scheme.
pub fn normalize_address(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if has_http_scheme(address) {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Full statistics URL for a registered site address.
pub fn statistics_url(address: &str) -> String {
    format!("{}{}", normalize_address(address), STATISTICS_PATH)
}

/// HTTP client for remote statistics documents.
///
/// No retries and no timeouts beyond the transport defaults.
#[derive(Clone, Default)]
pub struct SnapshotFetcher {
    client: Client,
}

impl SnapshotFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch and parse the statistics document of the site at `address`.
    pub async fn fetch(&self, address: &str) -> Result<Snapshot, SyncError> {
        let url = statistics_url(address);
        tracing::debug!("GET {}", url);

        let fail = |cause: String| SyncError::Fetch {
            address: address.to_string(),
            cause,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fail(e.to_string()))?;

        let body = response.bytes().await.map_err(|e| fail(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| fail(format!("invalid statistics document: {}", e)))
    }
}
