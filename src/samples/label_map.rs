//! Resolve class names for label indices found in a sample container.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::dataset::LABELS_FILE_NAME;

/// Index to class name, as used when naming exported samples.
pub type IndexNames = BTreeMap<i64, String>;

#[derive(Debug, Error)]
pub enum LabelMapReadError {
    #[error("failed to read label map {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("label map {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The direction a label map document was written in.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelMapSource {
    IndexToLabel(Map<String, Value>),
    LabelToIndex(Map<String, Value>),
}

impl LabelMapSource {
    /// Pick the direction to use; `index_to_label` wins when both exist.
    pub fn from_document(document: &Value) -> Option<Self> {
        let object = document.as_object()?;
        if let Some(Value::Object(map)) = object.get("index_to_label") {
            return Some(Self::IndexToLabel(map.clone()));
        }
        if let Some(Value::Object(map)) = object.get("label_to_index") {
            return Some(Self::LabelToIndex(map.clone()));
        }
        None
    }

    /// Normalize to index to name, dropping entries whose index is not an
    /// integer.
    pub fn into_index_names(self) -> IndexNames {
        match self {
            Self::IndexToLabel(map) => map
                .into_iter()
                .filter_map(|(key, value)| Some((parse_index_key(&key)?, value_to_name(value))))
                .collect(),
            Self::LabelToIndex(map) => map
                .into_iter()
                .filter_map(|(name, value)| Some((parse_index_value(&value)?, name)))
                .collect(),
        }
    }
}

/// Load and normalize a label map file.
///
/// Returns `Ok(None)` when the document has neither direction, which callers
/// treat the same as having no label map at all.
pub fn load_index_names(path: &Path) -> Result<Option<IndexNames>, LabelMapReadError> {
    let file = File::open(path).map_err(|source| LabelMapReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| LabelMapReadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(LabelMapSource::from_document(&document).map(LabelMapSource::into_index_names))
}

/// Resolve names from an explicit path, or from `labels.json` beside the
/// container when no path is given.
pub fn resolve_index_names(
    explicit: Option<&Path>,
    container_path: &Path,
) -> Result<Option<IndexNames>, LabelMapReadError> {
    match explicit {
        Some(path) => load_index_names(path),
        None => match sidecar_label_map(container_path) {
            Some(path) => load_index_names(&path),
            None => Ok(None),
        },
    }
}

/// `labels.json` next to the container, if present.
pub fn sidecar_label_map(container_path: &Path) -> Option<PathBuf> {
    let candidate = container_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(LABELS_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

fn parse_index_key(key: &str) -> Option<i64> {
    key.trim().parse().ok()
}

fn parse_index_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => parse_index_key(text),
        _ => None,
    }
}

fn value_to_name(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
