//! Config and data file resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rdkmgr_db::enabled::ENABLED_STATIONS_FILE;
use rdkmgr_db::resolve_data_dir;

/// Resolves the config file path.
///
/// - If `dir` is `Some`, returns `{dir}/config.toml`.
/// - Otherwise returns `~/.config/rdkmgr/config.toml`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join("config.toml"));
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("rdkmgr")
        .join("config.toml"))
}

/// Resolves the enabled-station list path (next to the database).
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn resolve_enabled_path(dir: Option<&Path>) -> Result<PathBuf> {
    Ok(resolve_data_dir(dir)?.join(ENABLED_STATIONS_FILE))
}
