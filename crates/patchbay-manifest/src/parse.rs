//! Line-oriented manifest parsing.

use tracing::warn;

use crate::ManifestEntry;

/// Fields per manifest line: name, size, path, url, backup url, enabled.
const FIELDS_PER_LINE: usize = 6;

/// Parse raw manifest text into enabled entries, preserving order.
///
/// Lines are comma-separated with an optional trailing `;`. A line with
/// the wrong field count or a flag other than `1` is dropped silently; a
/// line whose size field does not parse is dropped with a warning, since
/// that usually means a malformed upload rather than a disabled entry.
/// Bad lines never fail the parse as a whole.
pub fn parse_manifest(text: &str) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.strip_suffix(';').unwrap_or(line);
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != FIELDS_PER_LINE {
            continue;
        }

        if !matches!(parts[5].parse::<i64>(), Ok(1)) {
            continue;
        }

        let expected_size = match parts[1].parse::<u64>() {
            Ok(size) => size,
            Err(_) => {
                warn!(size = parts[1], line, "unparsable size field, skipping entry");
                continue;
            }
        };

        entries.push(ManifestEntry {
            name: parts[0].to_string(),
            expected_size,
            relative_path: parts[2].to_string(),
            primary_url: parts[3].to_string(),
            backup_url: parts[4].to_string(),
        });
    }

    entries
}
