use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create temporary file in {dir}")]
    TempFile {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write staged content for {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to replace {path}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    fn io_source(&self) -> &io::Error {
        match self {
            Error::CreateDir { source, .. }
            | Error::TempFile { source, .. }
            | Error::Write { source, .. }
            | Error::Replace { source, .. }
            | Error::Remove { source, .. } => source,
        }
    }

    /// Whether the underlying failure was an OS access-control rejection.
    ///
    /// Callers use this to distinguish an ordinary I/O failure from one
    /// that an elevated re-run could fix.
    pub fn is_permission_denied(&self) -> bool {
        self.io_source().kind() == io::ErrorKind::PermissionDenied
    }
}

pub type Result<T> = std::result::Result<T, Error>;
