//! Deciding which manifest entries need fetching.

use std::fs;
use std::path::{MAIN_SEPARATOR_STR, Path};

use tracing::info;

use crate::{ManifestEntry, UpdateDescriptor};

/// Normalize a `/`-separated manifest path to the platform separator.
fn normalize(relative: &str) -> String {
    if MAIN_SEPARATOR_STR == "/" {
        relative.to_string()
    } else {
        relative.replace('/', MAIN_SEPARATOR_STR)
    }
}

/// Whether the local file at `path` needs refetching.
///
/// Stale means missing or a byte length that differs from the manifest's
/// expected size. A path that cannot be stat'ed at all also counts as
/// stale: it cannot be verified. No other metadata is consulted.
pub fn is_stale(path: &Path, expected_size: u64) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.len() != expected_size,
        Err(_) => true,
    }
}

/// Build the update batch: every entry whose local file under `base_dir`
/// is missing or the wrong size, in manifest order.
pub fn plan_updates(entries: Vec<ManifestEntry>, base_dir: &Path) -> Vec<UpdateDescriptor> {
    let batch: Vec<UpdateDescriptor> = entries
        .into_iter()
        .filter_map(|entry| {
            let relative = normalize(&entry.relative_path);
            let path = base_dir.join(&relative);
            if !is_stale(&path, entry.expected_size) {
                return None;
            }
            Some(UpdateDescriptor {
                name: entry.name,
                relative_path: relative,
                path,
                size_expected: entry.expected_size,
                url: entry.primary_url,
                backup_url: entry.backup_url,
            })
        })
        .collect();

    info!(stale = batch.len(), "staleness check complete");
    batch
}
