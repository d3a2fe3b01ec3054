//! Library exports for reuse in benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// TOML defaults for the build and extract pipelines.
pub mod config;
/// Build a flat, labeled corpus from a class-per-folder image tree.
pub mod dataset;
/// Tracing subscriber setup.
pub mod logging;
/// Export generated sample containers to PNG files.
pub mod samples;
/// Named noise schedules.
pub mod schedule;
