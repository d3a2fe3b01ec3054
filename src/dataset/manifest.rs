use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name of the build manifest inside a built dataset.
pub const MANIFEST_FILE_NAME: &str = "manifest.csv";

/// One materialized image: where it came from and what it became.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub src_path: String,
    pub dst_filename: String,
    pub label: String,
    pub label_index: usize,
}

/// Append-only CSV writer; every row is flushed so an interrupted build
/// leaves a readable prefix.
pub struct ManifestWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ManifestWriter {
    pub fn create(path: &Path) -> csv::Result<Self> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["src_path", "dst_filename", "label", "label_index"])?;
        writer.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &ManifestRecord) -> csv::Result<()> {
        let label_index = record.label_index.to_string();
        self.writer.write_record([
            record.src_path.as_str(),
            record.dst_filename.as_str(),
            record.label.as_str(),
            label_index.as_str(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> csv::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a build manifest back into records.
pub fn read_manifest(path: &Path) -> csv::Result<Vec<ManifestRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader.deserialize().collect()
}
