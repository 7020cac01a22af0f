use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Write `bytes` to `target_dir/file_name` without exposing a partial
/// file.
///
/// The bytes go to a uniquely named `update_*.tmp` file inside
/// `target_dir` first; the handle is synced and closed before the rename
/// so the final path only ever receives fully flushed content. The
/// rename is atomic on a single volume. If it fails (staging and target
/// on different volumes), the final path is overwritten directly from
/// the in-memory bytes instead; that last resort has a short window
/// where a concurrent reader can observe a truncated file.
///
/// The temporary file never outlives the call: it either becomes the
/// final file or is removed on the failure path.
///
/// Returns the number of bytes written.
pub fn install_bytes(target_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<u64> {
    fs::create_dir_all(target_dir).map_err(|e| Error::CreateDir {
        path: target_dir.to_path_buf(),
        source: e,
    })?;

    let final_path = target_dir.join(file_name);

    let mut tmp = tempfile::Builder::new()
        .prefix("update_")
        .suffix(".tmp")
        .tempfile_in(target_dir)
        .map_err(|e| Error::TempFile {
            dir: target_dir.to_path_buf(),
            source: e,
        })?;

    let write_err = |e: io::Error| Error::Write {
        path: final_path.clone(),
        source: e,
    };
    tmp.write_all(bytes).map_err(|e| write_err(e))?;
    tmp.flush().map_err(|e| write_err(e))?;
    // Surfaces deferred write errors that would otherwise be swallowed
    // when the handle closes.
    tmp.as_file().sync_all().map_err(|e| write_err(e))?;

    let tmp_path = tmp.into_temp_path();
    if let Err(persist) = tmp_path.persist(&final_path) {
        warn!(
            path = %final_path.display(),
            error = %persist.error,
            "rename failed, overwriting target directly"
        );
        // `persist.path` still owns the temporary file and removes it on
        // drop, whichever way the direct write goes.
        fs::write(&final_path, bytes).map_err(|e| Error::Replace {
            path: final_path.clone(),
            source: e,
        })?;
    }

    debug!(path = %final_path.display(), bytes = bytes.len(), "installed");
    Ok(bytes.len() as u64)
}

/// Remove `path` if it exists.
///
/// A missing file is success: removal is idempotent from the caller's
/// point of view. Returns whether a file was actually removed.
pub fn remove_existing(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
