//! Asking the version service whether a newer build exists.

use serde::{Deserialize, Serialize};
use tracing::info;

use patchbay_fetch::HttpClient;

use crate::error::{Result, SelfUpdateError};

/// The remote version document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub url: String,
    #[serde(default)]
    pub notes: String,
}

/// Answer of a version check.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateCheck {
    pub update_available: bool,
    pub current_version: String,
    pub latest: Option<VersionInfo>,
}

/// Compare two version strings the way the update server publishes them.
///
/// TODO: plain string ordering misorders multi-digit components
/// ("1.10.0" sorts below "1.9.0"); confirm the server's versioning
/// scheme before moving this to a structured comparison.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    candidate > current
}

/// Fetch the version document and compare it against `current_version`.
pub async fn check<C: HttpClient>(
    client: &C,
    version_url: &str,
    current_version: &str,
) -> Result<UpdateCheck> {
    let body = client
        .get_bytes(version_url)
        .await
        .map_err(|e| SelfUpdateError::VersionUnavailable(Box::new(e)))?;

    let latest: VersionInfo = serde_json::from_slice(&body)?;
    let available = is_newer(&latest.version, current_version);
    info!(
        current = current_version,
        latest = %latest.version,
        available,
        "version check complete"
    );

    Ok(UpdateCheck {
        update_available: available,
        current_version: current_version.to_string(),
        latest: available.then_some(latest),
    })
}
