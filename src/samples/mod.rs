//! Extract side: turn a packed sample container back into labeled images.

pub mod container;
mod extract;
pub mod label_map;
pub mod manifest;
pub mod roles;

pub use container::{ArrayInfo, ContainerError, ElementType, SampleContainer};
pub use extract::{
    ExtractError, ExtractOptions, ExtractSummary, SampleTarget, extract_samples,
    sanitize_class_name,
};
pub use label_map::{
    IndexNames, LabelMapReadError, LabelMapSource, load_index_names, resolve_index_names,
};
pub use manifest::{EXPORT_MANIFEST_FILE_NAME, ExportManifestRecord, read_export_manifest};
pub use roles::{ArrayRoles, classify_arrays};
