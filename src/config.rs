//! TOML defaults for the build and extract pipelines and for logging.
//!
//! The file lives at `<app root>/imgcorpus.toml` unless a path is given
//! explicitly. Every key is optional; missing keys take the pipeline
//! defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::dataset::BuildOptions;
use crate::samples::ExtractOptions;

/// Default filename used to store pipeline defaults.
pub const CONFIG_FILE_NAME: &str = "imgcorpus.toml";

/// Errors that may occur while loading or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Defaults for [`crate::dataset::build_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub use_links: bool,
    pub keep_original_stem: bool,
    pub prefix_class_index: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        let options = BuildOptions::default();
        Self {
            use_links: options.use_links,
            keep_original_stem: options.keep_original_stem,
            prefix_class_index: options.prefix_class_index,
        }
    }
}

/// Defaults for [`crate::samples::extract_samples`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    pub use_subdirs: bool,
    /// 0 exports every sample.
    pub limit: usize,
    /// Label map used when a run does not name one.
    pub label_map: Option<PathBuf>,
}

/// Settings read by [`crate::logging::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Where run logs go; the app `logs/` directory when unset.
    pub directory: Option<PathBuf>,
    /// `EnvFilter` directives, overridden by `RUST_LOG` when that is set.
    pub filter: String,
    /// Run logs kept after pruning, including the current one.
    pub keep: usize,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            directory: None,
            filter: "info".to_string(),
            keep: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub build: BuildSection,
    pub extract: ExtractSection,
    pub logging: LoggingSection,
}

impl CorpusConfig {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            use_links: self.build.use_links,
            keep_original_stem: self.build.keep_original_stem,
            prefix_class_index: self.build.prefix_class_index,
        }
    }

    pub fn extract_options(
        &self,
        container_path: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> ExtractOptions {
        ExtractOptions {
            label_map_path: self.extract.label_map.clone(),
            use_subdirs: self.extract.use_subdirs,
            limit: self.extract.limit,
            ..ExtractOptions::new(container_path, out_dir)
        }
    }
}

/// Resolve the configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load the app-level configuration, returning defaults if it is missing.
pub fn load_or_default() -> Result<CorpusConfig, ConfigError> {
    load_from_path(&config_path()?)
}

/// Load configuration from `path`; a missing file yields defaults.
pub fn load_from_path(path: &Path) -> Result<CorpusConfig, ConfigError> {
    if !path.exists() {
        return Ok(CorpusConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Write configuration to `path`, creating parent directories.
pub fn save_to_path(config: &CorpusConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
