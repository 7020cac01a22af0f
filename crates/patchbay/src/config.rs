//! Persisted user configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// On-disk settings, stored as JSON under the user config dir.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Override for the base install directory; empty means "use the
    /// platform default".
    pub custom_base_path: String,
}

/// Where the config file lives: `<user config dir>/patchbay/config.json`.
/// Creates the directory on first use.
pub fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("no user configuration directory")?
        .join("patchbay");
    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create config directory {}", dir.display()))?;
    Ok(dir.join("config.json"))
}

/// Load the configuration. A missing file means defaults; a corrupt file
/// is reset to defaults rather than blocking startup.
pub fn load(path: &Path) -> Config {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

pub fn save(path: &Path, config: &Config) -> Result<()> {
    let body = serde_json::to_vec_pretty(config)?;
    fs::write(path, body).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
