use std::path::PathBuf;

use thiserror::Error;

use patchbay_fetch::FetchError;

#[derive(Debug, Error)]
pub enum UpdateError {
    /// The manifest source was unreachable or answered with a
    /// non-success status. Fatal for the whole check: there is nothing
    /// to compare against.
    #[error("update list unavailable")]
    ManifestUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("download failed")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Install(#[from] patchbay_fs::Error),

    /// A descriptor whose path cannot name a file (empty relative path).
    #[error("descriptor target {0} has no file name")]
    BadTarget(PathBuf),
}

impl UpdateError {
    /// Whether this failure would go away with elevated privileges.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, UpdateError::Install(e) if e.is_permission_denied())
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;

/// Render an error with its full source chain, for report entries that
/// cross an API boundary as plain text.
pub(crate) fn render_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
