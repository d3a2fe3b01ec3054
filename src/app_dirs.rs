//! Where imgcorpus keeps its config file and run logs.
//!
//! Everything lives under `<os config dir>/.imgcorpus`. Setting
//! `IMGCORPUS_CONFIG_HOME` replaces the OS config dir, which is how tests and
//! portable installs keep their files together.

use std::ffi::OsString;
use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".imgcorpus";
pub const LOGS_DIR_NAME: &str = "logs";
/// Environment variable that replaces the OS config root.
pub const CONFIG_HOME_ENV: &str = "IMGCORPUS_CONFIG_HOME";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory available; set {CONFIG_HOME_ENV}")]
    NoBaseDir,
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.imgcorpus` root, created on first use.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let os_config = BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf());
    let root = root_from(std::env::var_os(CONFIG_HOME_ENV), os_config)
        .ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(root)
}

/// Default directory for run logs, created on first use.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join(LOGS_DIR_NAME))
}

/// Create `path` (and parents) and hand it back.
pub fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// An empty override counts as unset.
fn root_from(config_home: Option<OsString>, os_config: Option<PathBuf>) -> Option<PathBuf> {
    config_home
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or(os_config)
        .map(|base| base.join(APP_DIR_NAME))
}
