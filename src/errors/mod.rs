//! Error handling module for the site statistics reconciler.
//!
//! Provides one error type for the whole run, split into fatal errors that stop
//! the batch and per-site errors that only skip the affected site.

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    pub const SITE_RESOLUTION_ERROR: &str = "SITE_RESOLUTION_ERROR";
    pub const WRITE_ERROR: &str = "WRITE_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum SyncError {
    /// Configuration file missing, malformed, or missing a required key
    Config(String),
    /// Store connection cannot be established or used
    StoreUnavailable(String),
    /// A single site's statistics could not be fetched or parsed
    Fetch { address: String, cause: String },
    /// A fetched site's address no longer resolves to a known site id
    SiteResolution { address: String },
    /// An insert or update failed inside a site's transaction
    Write { address: String, cause: String },
}

impl SyncError {
    /// Whether this error stops the whole run rather than a single site.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Config(_) | SyncError::StoreUnavailable(_) => true,
            SyncError::Fetch { .. } | SyncError::SiteResolution { .. } | SyncError::Write { .. } => {
                false
            }
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Config(_) => codes::CONFIG_ERROR,
            SyncError::StoreUnavailable(_) => codes::STORE_UNAVAILABLE,
            SyncError::Fetch { .. } => codes::FETCH_ERROR,
            SyncError::SiteResolution { .. } => codes::SITE_RESOLUTION_ERROR,
            SyncError::Write { .. } => codes::WRITE_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            SyncError::Config(msg) => msg.clone(),
            SyncError::StoreUnavailable(msg) => msg.clone(),
            SyncError::Fetch { address, cause } => {
                format!("Failed to retrieve data from '{}': {}", address, cause)
            }
            SyncError::SiteResolution { address } => {
                format!("No site registered with address '{}'", address)
            }
            SyncError::Write { address, cause } => {
                format!("Failed to write data for '{}': {}", address, cause)
            }
        }
    }

    /// Wrap a failed statement issued inside a site's transaction.
    pub fn write(address: &str, err: sqlx::Error) -> Self {
        tracing::error!("Write error for {}: {:?}", address, err);
        SyncError::Write {
            address: address.to_string(),
            cause: err.to_string(),
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for SyncError {}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        SyncError::StoreUnavailable(format!("Database error: {}", err))
    }
}

impl From<ini::Error> for SyncError {
    fn from(err: ini::Error) -> Self {
        SyncError::Config(format!("Malformed configuration file: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SyncError::Config("missing".into()).is_fatal());
        assert!(SyncError::StoreUnavailable("down".into()).is_fatal());
        assert!(!SyncError::Fetch {
            address: "a".into(),
            cause: "b".into()
        }
        .is_fatal());
        assert!(!SyncError::SiteResolution { address: "a".into() }.is_fatal());
        assert!(!SyncError::Write {
            address: "a".into(),
            cause: "b".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_display_includes_code() {
        let err = SyncError::SiteResolution {
            address: "example.org".into(),
        };
        assert_eq!(
            err.to_string(),
            "SITE_RESOLUTION_ERROR: No site registered with address 'example.org'"
        );
    }

    #[test]
    fn test_sqlx_error_is_store_unavailable() {
        let err: SyncError = sqlx::Error::PoolClosed.into();
        assert_eq!(err.error_code(), codes::STORE_UNAVAILABLE);
        assert!(err.is_fatal());
    }
}
