//! Flatten a class-per-folder image tree into a uniquely named corpus.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::discovery::{DiscoveredImage, discover_images};
use super::labels::{LABELS_FILE_NAME, LabelMap, LabelMapError};
use super::manifest::{MANIFEST_FILE_NAME, ManifestRecord, ManifestWriter};
use super::materialize::{Materialized, link_or_copy};
use super::naming::{NameParts, NameReserver, TokenSource, UuidTokens};
use super::progress::{BuildProgress, progress_tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Symlink destination files to their sources, copying when links fail.
    pub use_links: bool,
    /// Include the source file stem in destination names.
    pub keep_original_stem: bool,
    /// Prefix destination names with the zero-padded class index.
    pub prefix_class_index: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            use_links: false,
            keep_original_stem: true,
            prefix_class_index: false,
        }
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub out_dir: PathBuf,
    /// Number of files materialized.
    pub count: usize,
    pub num_classes: usize,
    pub labels_json: PathBuf,
    pub manifest: PathBuf,
    /// How many of `count` ended up as symlinks.
    pub linked: usize,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("label map error: {0}")]
    Labels(#[from] LabelMapError),
    #[error("manifest error: {0}")]
    Manifest(#[from] csv::Error),
    #[error("failed to materialize {src} as {dst}: {source}")]
    Materialize {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },
}

/// Build a flat dataset with random disambiguators and no progress reporting.
pub fn build_dataset(
    source_dir: &Path,
    dest_dir: &Path,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let mut tokens = UuidTokens;
    let mut progress = None;
    build_dataset_with(source_dir, dest_dir, options, &mut tokens, &mut progress)
}

/// Build a flat dataset using the given token source and progress callback.
///
/// Discovery runs to completion before any index is assigned. An empty tree
/// still produces an empty `labels.json` and a header-only manifest.
pub fn build_dataset_with(
    source_dir: &Path,
    dest_dir: &Path,
    options: &BuildOptions,
    tokens: &mut dyn TokenSource,
    progress: &mut Option<&mut dyn FnMut(BuildProgress)>,
) -> Result<BuildReport, BuildError> {
    if !source_dir.is_dir() {
        return Err(BuildError::SourceNotFound(source_dir.to_path_buf()));
    }
    let source_root = fs::canonicalize(source_dir).map_err(|source| BuildError::Walk {
        path: source_dir.to_path_buf(),
        source,
    })?;

    let images = collect_images(&source_root)?;
    let (label_map, assigned) = LabelMap::assign(images.iter().map(|image| &image.raw_label));
    if images.is_empty() {
        warn!(
            source = %source_root.display(),
            "No images found; writing an empty dataset"
        );
    }
    info!(
        source = %source_root.display(),
        images = images.len(),
        classes = label_map.len(),
        "Building dataset"
    );

    fs::create_dir_all(dest_dir).map_err(|source| BuildError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;
    let labels_json = dest_dir.join(LABELS_FILE_NAME);
    label_map.save(&labels_json)?;

    let mut manifest = ManifestWriter::create(&dest_dir.join(MANIFEST_FILE_NAME))?;
    let manifest_path = manifest.path().to_path_buf();
    let mut reserver = NameReserver::new(dest_dir);
    let mut linked = 0;
    for (processed, (image, (label, label_index))) in images.iter().zip(assigned).enumerate() {
        let (record, mode) = materialize_image(
            image,
            label,
            label_index,
            dest_dir,
            options,
            &mut reserver,
            tokens,
        )?;
        if mode == Materialized::Linked {
            linked += 1;
        }
        manifest.append(&record)?;
        progress_tick(progress, "materialize", processed + 1, images.len());
    }
    manifest.finish()?;

    let report = BuildReport {
        out_dir: dest_dir.to_path_buf(),
        count: reserver.len(),
        num_classes: label_map.len(),
        labels_json,
        manifest: manifest_path,
        linked,
    };
    info!(
        out_dir = %report.out_dir.display(),
        count = report.count,
        classes = report.num_classes,
        linked = report.linked,
        "Dataset build finished"
    );
    Ok(report)
}

fn collect_images(root: &Path) -> Result<Vec<DiscoveredImage>, BuildError> {
    discover_images(root)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| BuildError::Walk {
            path: root.to_path_buf(),
            source,
        })
}

fn materialize_image(
    image: &DiscoveredImage,
    label: String,
    label_index: usize,
    dest_dir: &Path,
    options: &BuildOptions,
    reserver: &mut NameReserver<'_>,
    tokens: &mut dyn TokenSource,
) -> Result<(ManifestRecord, Materialized), BuildError> {
    let parts = NameParts::for_source(
        &image.path,
        &label,
        label_index,
        options.keep_original_stem,
        options.prefix_class_index,
    );
    let dst_filename = reserver.reserve(&parts, tokens);
    let dst = dest_dir.join(&dst_filename);
    let mode = link_or_copy(&image.path, &dst, options.use_links).map_err(|source| {
        BuildError::Materialize {
            src: image.path.clone(),
            dst: dst.clone(),
            source,
        }
    })?;
    let record = ManifestRecord {
        src_path: image.path.to_string_lossy().into_owned(),
        dst_filename,
        label,
        label_index,
    };
    Ok((record, mode))
}
