//! Pure decisions: which URLs to try and in what order.

/// Placeholder the manifest writes for entries without a backup mirror.
const NO_BACKUP: &str = "0";

/// Build the ordered list of URLs to try.
///
/// The primary always leads. The backup joins only when it is present,
/// non-empty, and not the `"0"` placeholder.
pub fn mirror_urls<'a>(primary: &'a str, backup: Option<&'a str>) -> Vec<&'a str> {
    let mut urls = vec![primary];
    if let Some(backup) = backup {
        if !backup.is_empty() && backup != NO_BACKUP {
            urls.push(backup);
        }
    }
    urls
}
