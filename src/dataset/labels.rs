//! Canonical class labels and the persisted label map (`labels.json`).

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label used when a folder name has no usable characters.
pub const UNKNOWN_LABEL: &str = "unknown";
/// File name of the persisted label map inside a built dataset.
pub const LABELS_FILE_NAME: &str = "labels.json";

/// Normalize a raw folder name into a canonical class label.
///
/// The result is lowercase ASCII restricted to `[a-z0-9_-]`. Spaces become
/// hyphens and any run of two or more separators collapses to a single
/// underscore. Inputs with nothing left map to [`UNKNOWN_LABEL`].
pub fn normalize_label(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase().replace(' ', "-");
    let kept: Vec<char> = lowered
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-'))
        .collect();

    let mut out = String::with_capacity(kept.len());
    let mut idx = 0;
    while idx < kept.len() {
        let ch = kept[idx];
        if is_separator(ch) {
            let run_end = kept[idx..]
                .iter()
                .position(|c| !is_separator(*c))
                .map_or(kept.len(), |offset| idx + offset);
            if run_end - idx >= 2 {
                out.push('_');
            } else {
                out.push(ch);
            }
            idx = run_end;
        } else {
            out.push(ch);
            idx += 1;
        }
    }

    if out.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        out
    }
}

fn is_separator(ch: char) -> bool {
    ch == '-' || ch == '_'
}

/// Errors raised while reading or writing `labels.json`.
#[derive(Debug, Error)]
pub enum LabelMapError {
    #[error("io error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("json error on {path}: {source}")]
    Json {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
    #[error("label map in {0} is not a bijection")]
    Inconsistent(std::path::PathBuf),
}

/// Dense bijection between canonical labels and class indices.
///
/// Indices follow the ascending sort order of the distinct labels, so the
/// same source tree always yields the same assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Build a map from every raw label seen during discovery.
    pub fn from_raw_labels<I, S>(raw_labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = raw_labels
            .into_iter()
            .map(|raw| normalize_label(raw.as_ref()))
            .collect();
        Self {
            labels: distinct.into_iter().collect(),
        }
    }

    /// Build a map and pair every raw label, in input order, with its
    /// canonical form and class index.
    pub fn assign<I, S>(raw_labels: I) -> (Self, Vec<(String, usize)>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized: Vec<String> = raw_labels
            .into_iter()
            .map(|raw| normalize_label(raw.as_ref()))
            .collect();
        let distinct: BTreeSet<&str> = normalized.iter().map(String::as_str).collect();
        let map = Self {
            labels: distinct.into_iter().map(str::to_string).collect(),
        };
        // Every label is present, so its insertion point is its index.
        let assigned = normalized
            .into_iter()
            .map(|label| {
                let index = map.labels.partition_point(|known| *known < label);
                (label, index)
            })
            .collect();
        (map, assigned)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Canonical labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels
            .binary_search_by(|known| known.as_str().cmp(label))
            .ok()
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Both persisted directions, derived from the sorted label list.
    pub fn to_document(&self) -> LabelMapDocument {
        let index_to_label = self
            .labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx.to_string(), label.clone()))
            .collect();
        let label_to_index = self
            .labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), idx))
            .collect();
        LabelMapDocument {
            index_to_label,
            label_to_index,
        }
    }

    /// Write `labels.json` with both directions in a single open/close.
    pub fn save(&self, path: &Path) -> Result<(), LabelMapError> {
        let io_err = |source| LabelMapError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_document()).map_err(|source| {
            LabelMapError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)
    }

    /// Read a `labels.json` written by [`LabelMap::save`] and check that both
    /// directions agree.
    pub fn load(path: &Path) -> Result<Self, LabelMapError> {
        let file = File::open(path).map_err(|source| LabelMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: LabelMapDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| LabelMapError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let inconsistent = || LabelMapError::Inconsistent(path.to_path_buf());

        let mut by_index = BTreeMap::new();
        for (key, label) in &document.index_to_label {
            let idx: usize = key.parse().map_err(|_| inconsistent())?;
            by_index.insert(idx, label.clone());
        }
        let labels: Vec<String> = by_index.into_values().collect();
        let map = Self { labels };
        if map.to_document() != document {
            return Err(inconsistent());
        }
        Ok(map)
    }
}

/// On-disk shape of `labels.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapDocument {
    pub index_to_label: BTreeMap<String, String>,
    pub label_to_index: BTreeMap<String, usize>,
}
