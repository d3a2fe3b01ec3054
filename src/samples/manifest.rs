use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name of the export manifest inside the extraction directory.
pub const EXPORT_MANIFEST_FILE_NAME: &str = "manifest.csv";

/// One exported sample. Label fields are empty in the CSV when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifestRecord {
    pub idx: usize,
    /// Path relative to the extraction directory, `/`-separated.
    pub filename: String,
    pub label_index: Option<i64>,
    pub label_name: Option<String>,
}

/// Append-only CSV writer flushed after every row.
pub struct ExportManifestWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ExportManifestWriter {
    pub fn create(path: &Path) -> csv::Result<Self> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["idx", "filename", "label_index", "label_name"])?;
        writer.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &ExportManifestRecord) -> csv::Result<()> {
        let idx = record.idx.to_string();
        let label_index = record
            .label_index
            .map(|index| index.to_string())
            .unwrap_or_default();
        let label_name = record.label_name.as_deref().unwrap_or("");
        self.writer.write_record([
            idx.as_str(),
            record.filename.as_str(),
            label_index.as_str(),
            label_name,
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> csv::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read an export manifest back into records.
pub fn read_export_manifest(path: &Path) -> csv::Result<Vec<ExportManifestRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader.deserialize().collect()
}
