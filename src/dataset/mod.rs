//! Build side: turn a class-per-folder image tree into a flat corpus with a
//! label map and manifest.

mod build;
pub mod discovery;
pub mod labels;
pub mod manifest;
mod materialize;
pub mod naming;
mod progress;

pub use build::{BuildError, BuildOptions, BuildReport, build_dataset, build_dataset_with};
pub use discovery::{DiscoveredImage, ImageWalker, SUPPORTED_IMAGE_EXTENSIONS, discover_images};
pub use labels::{LABELS_FILE_NAME, LabelMap, LabelMapError, UNKNOWN_LABEL, normalize_label};
pub use manifest::{MANIFEST_FILE_NAME, ManifestRecord, read_manifest};
pub use materialize::{Materialized, copy_with_metadata, link_or_copy};
pub use naming::{SeededTokens, SequentialTokens, TokenSource, UuidTokens};
pub use progress::BuildProgress;
