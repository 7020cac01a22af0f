use std::io;
use std::path::PathBuf;

use thiserror::Error;

use patchbay_fetch::FetchError;

#[derive(Debug, Error)]
pub enum SelfUpdateError {
    #[error("version service unavailable")]
    VersionUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("malformed version document")]
    Malformed(#[from] serde_json::Error),

    #[error("download failed")]
    Fetch(#[from] FetchError),

    #[error("failed to stage new build at {path}")]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external helper is not next to the executable. Nothing was
    /// launched and the current binary is untouched.
    #[error("replacer helper missing at {path}")]
    ReplacerMissing { path: PathBuf },

    #[error("failed to launch replacer {path}")]
    ReplacerSpawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SelfUpdateError>;
