//! Data models for the site statistics reconciler.
//!
//! Persisted rows live in `site` and `remote`; the transient per-site payload
//! fetched over HTTP lives in `snapshot`.

mod remote;
mod site;
mod snapshot;

pub use remote::*;
pub use site::*;
pub use snapshot::*;
