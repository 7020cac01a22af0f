//! Mapping install modes onto the local content tree.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::ValueEnum;

use crate::config::Config;

/// Which content line a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Plus,
    #[value(name = "plusup")]
    PlusUp,
}

impl Mode {
    /// Directory for this mode's content under the base install.
    fn content_dir(self) -> &'static str {
        match self {
            Mode::Plus => "Plus",
            Mode::PlusUp => "PlusUP",
        }
    }

    /// Manifest feed for this mode.
    pub fn manifest_url(self) -> &'static str {
        match self {
            Mode::Plus => "https://content.patchbay.app/packages/PlusInfo2.txt",
            Mode::PlusUp => "https://content.patchbay.app/packages/PlusUPInfo2.txt",
        }
    }
}

#[cfg(windows)]
fn default_base_dir() -> PathBuf {
    let program_files =
        std::env::var("ProgramFiles(x86)").unwrap_or_else(|_| "C:\\Program Files (x86)".into());
    Path::new(&program_files).join("Patchbay")
}

#[cfg(not(windows))]
fn default_base_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/usr/local/share"))
        .join("patchbay")
}

/// Resolve the base install directory: an explicit override for this
/// run, then the configured one, then the platform default. The
/// directory must already exist; guessing wrong here would scatter
/// content across the disk.
pub fn resolve_base(config: &Config, override_path: Option<&Path>) -> Result<PathBuf> {
    let base = match override_path {
        Some(path) => path.to_path_buf(),
        None if !config.custom_base_path.is_empty() => {
            PathBuf::from(&config.custom_base_path)
        }
        None => default_base_dir(),
    };

    if !base.exists() {
        bail!(
            "base directory {} does not exist; point the configuration at the loader's install folder",
            base.display()
        );
    }
    Ok(base)
}

/// Target directory for catalog items: `<base>/<mode dir>/edata`.
pub fn resolve_target(mode: Mode, base: &Path) -> PathBuf {
    base.join(mode.content_dir()).join("edata")
}
