//! The remote content manifest: what should exist locally, where to
//! fetch it, and which of it is stale.
//!
//! The manifest is a line-oriented text feed. Parsing is deliberately
//! forgiving per line (a malformed line never fails the feed) and the
//! staleness rule is byte-length only: no timestamps, no hashes.

mod parse;
mod plan;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use parse::parse_manifest;
pub use plan::{is_stale, plan_updates};

/// One enabled manifest entry, before staleness filtering.
///
/// `relative_path` is kept exactly as written on the wire
/// (`/`-separated); [`plan_updates`] normalizes it for the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub expected_size: u64,
    pub relative_path: String,
    pub primary_url: String,
    pub backup_url: String,
}

/// A file that needs fetching: a manifest entry resolved against the
/// local content tree.
///
/// Created by [`plan_updates`], consumed once by the batch pipeline.
/// `backup_url` carries the wire value verbatim, including the `"0"`
/// placeholder; the fetcher owns that filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescriptor {
    pub name: String,
    pub relative_path: String,
    pub path: PathBuf,
    pub size_expected: u64,
    pub url: String,
    pub backup_url: String,
}
