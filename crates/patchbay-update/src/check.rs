//! The check operation: fetch the manifest, keep what is stale.

use std::path::Path;

use tracing::info;

use patchbay_fetch::HttpClient;
use patchbay_manifest::{UpdateDescriptor, parse_manifest, plan_updates};

use crate::error::{Result, UpdateError};

/// Download the manifest at `manifest_url` and plan the update batch
/// against the content tree rooted at `base_dir`.
///
/// A malformed manifest line never fails the check; an unreachable
/// manifest source fails it outright.
pub async fn check_for_updates<C: HttpClient>(
    client: &C,
    manifest_url: &str,
    base_dir: &Path,
) -> Result<Vec<UpdateDescriptor>> {
    let body = client
        .get_bytes(manifest_url)
        .await
        .map_err(|e| UpdateError::ManifestUnavailable(Box::new(e)))?;

    let text = String::from_utf8_lossy(&body);
    let batch = plan_updates(parse_manifest(&text), base_dir);
    info!(url = manifest_url, stale = batch.len(), "update check complete");
    Ok(batch)
}
