//! Home directory resolution.
//!
//! The catalog lives in one directory holding `db.sqlite` and one payload
//! file per record. It is chosen, in order, from an explicit path,
//! `$TAGMAGE_HOME`, `$XDG_DATA_HOME/tagmage`, or the platform data directory.

use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the home directory outright.
pub const HOME_ENV: &str = "TAGMAGE_HOME";

/// Environment variable for the XDG data directory.
pub const XDG_DATA_HOME_ENV: &str = "XDG_DATA_HOME";

/// Directory name used under a data directory.
pub const APP_DIR: &str = "tagmage";

/// Database file name inside the home directory.
pub const DB_FILE: &str = "db.sqlite";

/// Resolve the home directory from the process environment.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_home_with(explicit, |key| std::env::var(key).ok())
}

/// Resolve the home directory with a custom environment lookup.
pub fn resolve_home_with(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let var = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(home) = var(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    if let Some(data) = var(XDG_DATA_HOME_ENV) {
        return Ok(PathBuf::from(data).join(APP_DIR));
    }

    match dirs::data_local_dir() {
        Some(data) => Ok(data.join(APP_DIR)),
        None => eyre::bail!("Cannot locate a data directory; set {} or pass --home", HOME_ENV),
    }
}

/// Create the home directory (and parents) if it does not exist yet.
pub fn ensure_home(home: &Path) -> Result<()> {
    if home.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(home).with_context(|| format!("Failed to create {}", home.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(home, fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", home.display()))?;
    }

    log::info!("Created home directory {}", home.display());
    Ok(())
}

/// Path of the catalog database inside `home`.
pub fn db_path(home: &Path) -> PathBuf {
    home.join(DB_FILE)
}
