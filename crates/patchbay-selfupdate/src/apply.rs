//! Staging the new build and handing replacement off to the helper.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tokio_util::sync::CancellationToken;
use tracing::info;

use patchbay_fetch::{Fetcher, HttpClient};

use crate::check::VersionInfo;
use crate::error::{Result, SelfUpdateError};

/// File name of the external replacer helper, expected next to the
/// executable it replaces.
#[cfg(windows)]
pub const REPLACER_FILE: &str = "updater.exe";
#[cfg(not(windows))]
pub const REPLACER_FILE: &str = "updater";

/// Sibling path the new build is staged at: `<stem>_new<ext>` next to
/// the current executable.
pub fn staged_path(current_exe: &Path) -> PathBuf {
    let stem = current_exe
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("app");
    let name = match current_exe.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_new.{ext}"),
        None => format!("{stem}_new"),
    };
    current_exe.with_file_name(name)
}

/// Download the new build and hand replacement off to the helper.
///
/// The downloaded bytes are staged next to `current_exe` (never in
/// place: the current binary is running and locked), the helper's
/// presence is verified, and the helper is spawned with two positional
/// arguments: the current executable's path and the staged path. The
/// caller is expected to exit shortly after a successful return so the
/// helper can delete the old binary, rename the staged one into place,
/// and relaunch it.
///
/// Any failure before the spawn removes the staged file and leaves the
/// running executable untouched.
pub async fn apply<C: HttpClient>(
    fetcher: &Fetcher<C>,
    info: &VersionInfo,
    current_exe: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    info!(version = %info.version, url = %info.url, "downloading new build");
    let bytes = fetcher.fetch(&info.url, None, cancel).await?;

    let staged = staged_path(current_exe);
    stage(&staged, &bytes)?;
    info!(path = %staged.display(), "new build staged");

    let replacer = current_exe.with_file_name(REPLACER_FILE);
    if !replacer.exists() {
        let _ = fs::remove_file(&staged);
        return Err(SelfUpdateError::ReplacerMissing { path: replacer });
    }

    if let Err(source) = Command::new(&replacer).arg(current_exe).arg(&staged).spawn() {
        let _ = fs::remove_file(&staged);
        return Err(SelfUpdateError::ReplacerSpawn {
            path: replacer,
            source,
        });
    }

    info!("replacer launched, exiting shortly so it can take over");
    Ok(())
}

fn stage(path: &Path, bytes: &[u8]) -> Result<()> {
    let stage_err = |source| SelfUpdateError::Stage {
        path: path.to_path_buf(),
        source,
    };

    fs::write(path, bytes).map_err(&stage_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(source) = fs::set_permissions(path, fs::Permissions::from_mode(0o755)) {
            let _ = fs::remove_file(path);
            return Err(stage_err(source));
        }
    }

    Ok(())
}
