//! Tracing setup for hosts that drive the build and extract pipelines.
//!
//! [`init`] reads the `[logging]` section of [`CorpusConfig`], opens a
//! per-run `imgcorpus_<timestamp>.log` file and installs a global subscriber
//! that writes to stdout and to that file. Older run logs beyond the
//! configured count are removed.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};
use crate::config::{CorpusConfig, LoggingSection};

const RUN_LOG_PREFIX: &str = "imgcorpus_";
const RUN_LOG_SUFFIX: &str = ".log";
const FILE_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
const LINE_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Keeps the file writer alive for the rest of the process.
static ACTIVE: OnceLock<(WorkerGuard, PathBuf)> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open run log {path}: {source}")]
    OpenLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to prune old run logs in {path}: {source}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format run log timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("Invalid log filter {filter:?}: {source}")]
    Filter { filter: String, source: ParseError },
    #[error("Failed to install global tracing subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Resolved `[logging]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directory: PathBuf,
    pub filter: String,
    pub keep: usize,
}

impl LogSettings {
    /// Fill in the app logs directory when the section leaves it unset.
    pub fn resolve(section: &LoggingSection) -> Result<Self, LoggingError> {
        let directory = match &section.directory {
            Some(directory) => directory.clone(),
            None => app_dirs::logs_dir()?,
        };
        Ok(Self {
            directory,
            filter: section.filter.clone(),
            keep: section.keep.max(1),
        })
    }

    /// `RUST_LOG` wins over the configured directives.
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|source| LoggingError::Filter {
            filter: self.filter.clone(),
            source,
        })
    }
}

/// Install logging as configured and return the current run log path.
///
/// Later calls return the path chosen by the first one.
pub fn init(config: &CorpusConfig) -> Result<PathBuf, LoggingError> {
    if let Some((_, path)) = ACTIVE.get() {
        return Ok(path.clone());
    }
    init_with(&LogSettings::resolve(&config.logging)?)
}

pub fn init_with(settings: &LogSettings) -> Result<PathBuf, LoggingError> {
    if let Some((_, path)) = ACTIVE.get() {
        return Ok(path.clone());
    }
    let filter = settings.env_filter()?;
    let log_path = open_run_log(settings, now_local_or_utc())?;
    let file_name = log_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(RUN_LOG_PREFIX));
    let appender = tracing_appender::rolling::never(&settings.directory, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(offset, LINE_STAMP);
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_timer(timer.clone()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = ACTIVE.set((guard, log_path.clone()));
    tracing::info!(log = %log_path.display(), "Logging initialized");
    Ok(log_path)
}

/// Create this run's log file and prune older ones down to `settings.keep`.
fn open_run_log(settings: &LogSettings, now: OffsetDateTime) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(&settings.directory).map_err(|source| LoggingError::CreateDir {
        path: settings.directory.clone(),
        source,
    })?;
    let path = settings.directory.join(run_log_name(now)?);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::OpenLog {
            path: path.clone(),
            source,
        })?;
    prune_run_logs(&settings.directory, settings.keep).map_err(|source| LoggingError::Prune {
        path: settings.directory.clone(),
        source,
    })?;
    Ok(path)
}

fn run_log_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    Ok(format!(
        "{RUN_LOG_PREFIX}{}{RUN_LOG_SUFFIX}",
        now.format(FILE_STAMP)?
    ))
}

/// Run log names embed a sortable timestamp, so name order is age order.
/// Files not named like run logs are left alone.
fn prune_run_logs(dir: &Path, keep: usize) -> std::io::Result<()> {
    let mut runs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(RUN_LOG_PREFIX)
            && name.ends_with(RUN_LOG_SUFFIX)
            && entry.file_type()?.is_file()
        {
            runs.push(name);
        }
    }
    runs.sort();
    let excess = runs.len().saturating_sub(keep);
    for name in &runs[..excess] {
        fs::remove_file(dir.join(name))?;
    }
    Ok(())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(dir: &Path, keep: usize) -> LogSettings {
        LogSettings {
            directory: dir.join("runs"),
            filter: "info".to_string(),
            keep,
        }
    }

    #[test]
    fn run_log_name_embeds_timestamp() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            run_log_name(fixed).unwrap(),
            "imgcorpus_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn configured_directory_is_used_as_is() {
        let section = LoggingSection {
            directory: Some(PathBuf::from("/srv/corpus/logs")),
            filter: "imgcorpus=debug".to_string(),
            keep: 0,
        };
        let resolved = LogSettings::resolve(&section).unwrap();
        assert_eq!(resolved.directory, PathBuf::from("/srv/corpus/logs"));
        assert_eq!(resolved.filter, "imgcorpus=debug");
        assert_eq!(resolved.keep, 1);
    }

    #[test]
    fn bad_filter_is_reported() {
        let dir = tempdir().unwrap();
        let mut bad = settings(dir.path(), 3);
        bad.filter = "imgcorpus=loud".to_string();
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(bad.env_filter(), Err(LoggingError::Filter { .. })));
        }
    }

    #[test]
    fn opening_a_run_prunes_oldest_logs() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path(), 3);
        fs::create_dir_all(&settings.directory).unwrap();
        for day in 10..15 {
            fs::write(
                settings.directory.join(format!("imgcorpus_2023-01-{day}_00-00-00.log")),
                b"old",
            )
            .unwrap();
        }
        fs::write(settings.directory.join("notes.txt"), b"keep").unwrap();

        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let path = open_run_log(&settings, now).unwrap();
        assert!(path.is_file());

        let mut names: Vec<String> = fs::read_dir(&settings.directory)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "imgcorpus_2023-01-13_00-00-00.log",
                "imgcorpus_2023-01-14_00-00-00.log",
                "imgcorpus_2023-11-14_22-13-20.log",
                "notes.txt",
            ]
        );
    }

    #[test]
    fn reopening_the_same_second_appends() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path(), 2);
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let first = open_run_log(&settings, now).unwrap();
        fs::write(&first, b"line\n").unwrap();
        let second = open_run_log(&settings, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"line\n");
    }
}
