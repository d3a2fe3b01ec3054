//! Export generated sample containers back into labeled PNG files.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ColorType, ImageFormat};
use thiserror::Error;
use tracing::{info, warn};

use super::container::{ArrayInfo, ContainerError, SampleContainer};
use super::label_map::{IndexNames, LabelMapReadError, resolve_index_names};
use super::manifest::{EXPORT_MANIFEST_FILE_NAME, ExportManifestRecord, ExportManifestWriter};
use super::roles::{ArrayRoles, IMAGE_CHANNELS, classify_arrays};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub container_path: PathBuf,
    pub out_dir: PathBuf,
    /// Explicit label map; `labels.json` beside the container is tried otherwise.
    pub label_map_path: Option<PathBuf>,
    /// Place named samples in one sub-directory per class.
    pub use_subdirs: bool,
    /// Maximum samples to export; 0 exports everything.
    pub limit: usize,
}

impl ExtractOptions {
    pub fn new(container_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            container_path: container_path.into(),
            out_dir: out_dir.into(),
            label_map_path: None,
            use_subdirs: false,
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub out_dir: PathBuf,
    pub manifest: PathBuf,
    /// Number of PNG files written.
    pub exported: usize,
    pub image_array: String,
    pub label_array: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("container not found: {0}")]
    ContainerNotFound(PathBuf),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("container has no arrays")]
    EmptyContainer,
    #[error("unexpected sample shape at {index}: {shape:?} of {element} (expected HxWxC uint8, C in 1/3/4)")]
    MalformedSample {
        index: usize,
        shape: Vec<u64>,
        element: String,
    },
    #[error(transparent)]
    LabelMap(#[from] LabelMapReadError),
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] csv::Error),
}

/// Height, width and channel count shared by every sample of an image array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SampleShape {
    height: u32,
    width: u32,
    channels: u8,
}

impl SampleShape {
    fn of(images: &ArrayInfo) -> Option<Self> {
        if !images.element.is_u8() {
            return None;
        }
        let [_, height, width, channels] = images.shape.as_slice() else {
            return None;
        };
        if !IMAGE_CHANNELS.contains(channels) {
            return None;
        }
        Some(Self {
            height: u32::try_from(*height).ok()?,
            width: u32::try_from(*width).ok()?,
            channels: u8::try_from(*channels).ok()?,
        })
    }

    fn frame_len(&self) -> usize {
        self.height as usize * self.width as usize * self.channels as usize
    }

    /// Single-channel frames are written as 2-D grayscale images.
    fn color_type(&self) -> ColorType {
        match self.channels {
            1 => ColorType::L8,
            3 => ColorType::Rgb8,
            _ => ColorType::Rgba8,
        }
    }
}

/// Export every sample (up to `limit`) as a PNG and write `manifest.csv`.
pub fn extract_samples(options: &ExtractOptions) -> Result<ExtractSummary, ExtractError> {
    if !options.container_path.is_file() {
        return Err(ExtractError::ContainerNotFound(options.container_path.clone()));
    }
    let names = resolve_index_names(options.label_map_path.as_deref(), &options.container_path)?;
    let mut container = SampleContainer::open(&options.container_path)?;
    let roles = classify_arrays(container.arrays())?;
    log_roles(&roles);

    let count = sample_count(&roles.images, options.limit);
    let frames = load_frames(&mut container, &roles.images, count)?;
    let labels = match &roles.labels {
        Some(info) => Some(container.read_integers(&info.name)?),
        None => None,
    };
    if let Some(labels) = &labels
        && labels.len() < count
    {
        warn!(
            labels = labels.len(),
            samples = count,
            "Label array is shorter than the image array; tail samples are unlabeled"
        );
    }

    create_dir(&options.out_dir)?;
    let mut manifest = ExportManifestWriter::create(&options.out_dir.join(EXPORT_MANIFEST_FILE_NAME))?;
    if let Some((shape, pixels)) = &frames {
        for index in 0..count {
            let label_index = labels.as_ref().and_then(|labels| labels.get(index).copied());
            let target = SampleTarget::resolve(index, label_index, names.as_ref(), options.use_subdirs);
            let frame = &pixels[index * shape.frame_len()..(index + 1) * shape.frame_len()];
            let path = options.out_dir.join(&target.relative_path);
            if let Some(parent) = path.parent() {
                create_dir(parent)?;
            }
            image::save_buffer_with_format(
                &path,
                frame,
                shape.width,
                shape.height,
                shape.color_type(),
                ImageFormat::Png,
            )
            .map_err(|source| ExtractError::Encode {
                path: path.clone(),
                source,
            })?;
            manifest.append(&ExportManifestRecord {
                idx: index,
                filename: target.relative_path,
                label_index,
                label_name: target.label_name,
            })?;
        }
    }
    let manifest_path = manifest.path().to_path_buf();
    manifest.finish()?;

    info!(
        out_dir = %options.out_dir.display(),
        manifest = %manifest_path.display(),
        exported = count,
        "Sample extraction finished"
    );
    Ok(ExtractSummary {
        out_dir: options.out_dir.clone(),
        manifest: manifest_path,
        exported: count,
        image_array: roles.images.name,
        label_array: roles.labels.map(|info| info.name),
    })
}

fn log_roles(roles: &ArrayRoles) {
    match &roles.labels {
        Some(labels) => info!(
            images = %roles.images.name,
            labels = %labels.name,
            shape = ?labels.shape,
            "Found label array"
        ),
        None => info!(
            images = %roles.images.name,
            "No label array found (unconditional or unlabeled samples)"
        ),
    }
}

fn sample_count(images: &ArrayInfo, limit: usize) -> usize {
    let total = images.len();
    if limit > 0 { total.min(limit) } else { total }
}

/// Validate the per-sample shape and read pixel data, unless nothing is
/// going to be exported.
fn load_frames(
    container: &mut SampleContainer,
    images: &ArrayInfo,
    count: usize,
) -> Result<Option<(SampleShape, Vec<u8>)>, ExtractError> {
    if count == 0 {
        return Ok(None);
    }
    let shape = SampleShape::of(images).ok_or_else(|| ExtractError::MalformedSample {
        index: 0,
        shape: images.shape.iter().skip(1).copied().collect(),
        element: format!("{:?}", images.element),
    })?;
    let pixels = container.read_u8(&images.name)?;
    Ok(Some((shape, pixels)))
}

fn create_dir(path: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(path).map_err(|source| ExtractError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Where a sample is written and which class name it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTarget {
    /// `/`-separated path relative to the extraction directory.
    pub relative_path: String,
    pub label_name: Option<String>,
}

impl SampleTarget {
    pub fn resolve(
        index: usize,
        label_index: Option<i64>,
        names: Option<&IndexNames>,
        use_subdirs: bool,
    ) -> Self {
        let label_name = label_index
            .zip(names)
            .and_then(|(label, names)| names.get(&label).cloned());
        let relative_path = match (&label_name, label_index) {
            (Some(name), _) => {
                let safe = sanitize_class_name(name);
                // An empty directory component would turn the path absolute.
                if use_subdirs && !safe.is_empty() {
                    format!("{safe}/{safe}_{index:06}.png")
                } else {
                    format!("{safe}_{index:06}.png")
                }
            }
            (None, Some(label)) => format!("class{label}_{index:06}.png"),
            (None, None) => format!("sample_{index:06}.png"),
        };
        Self {
            relative_path,
            label_name,
        }
    }
}

/// Replace anything but alphanumerics, `-` and `_` with `_`.
pub fn sanitize_class_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
