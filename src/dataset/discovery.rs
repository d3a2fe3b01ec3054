//! Recursive discovery of labeled image files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Supported image extensions (lowercase, without dots).
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 7] =
    ["jpg", "jpeg", "png", "bmp", "webp", "tif", "tiff"];

/// Return true if the path has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// An image file together with the name of the folder that labels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImage {
    pub path: PathBuf,
    /// Immediate parent directory name, not yet normalized.
    pub raw_label: String,
}

impl DiscoveredImage {
    fn from_path(path: PathBuf) -> Self {
        let raw_label = path
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, raw_label }
    }
}

/// Lazy depth-first walk over a directory tree yielding supported images.
///
/// Entries of each directory are visited in file-name order. Symlinked files
/// are yielded; symlinked directories are not descended into. Unreadable
/// sub-directories are skipped with a warning, while an unreadable root is
/// reported as the first item.
pub struct ImageWalker {
    root: PathBuf,
    stack: Vec<PathBuf>,
    pending: std::vec::IntoIter<DiscoveredImage>,
}

impl ImageWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            stack: vec![root.clone()],
            root,
            pending: Vec::new().into_iter(),
        }
    }

    fn read_dir_sorted(&self, dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(
                    dir = %dir.display(),
                    error = %err,
                    "Failed to read directory entry during discovery"
                ),
            }
        }
        entries.sort_by_key(|entry| entry.file_name());
        Ok(entries)
    }

    fn expand(&mut self, dir: &Path) -> std::io::Result<()> {
        let entries = self.read_dir_sorted(dir)?;
        let mut images = Vec::new();
        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                subdirs.push(path);
                continue;
            }
            let is_file = if file_type.is_symlink() {
                match fs::metadata(&path) {
                    Ok(meta) if meta.is_file() => true,
                    Ok(meta) if meta.is_dir() => {
                        debug!(path = %path.display(), "Not following directory symlink");
                        false
                    }
                    _ => false,
                }
            } else {
                file_type.is_file()
            };
            if is_file && is_supported_image(&path) {
                images.push(DiscoveredImage::from_path(path));
            }
        }
        // Reverse so the stack pops sub-directories in name order.
        self.stack.extend(subdirs.into_iter().rev());
        self.pending = images.into_iter();
        Ok(())
    }
}

impl Iterator for ImageWalker {
    type Item = std::io::Result<DiscoveredImage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(image) = self.pending.next() {
                return Some(Ok(image));
            }
            let dir = self.stack.pop()?;
            if let Err(err) = self.expand(&dir) {
                if dir == self.root {
                    return Some(Err(err));
                }
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "Failed to read directory during discovery"
                );
            }
        }
    }
}

/// Start a fresh discovery pass rooted at `root`.
pub fn discover_images(root: &Path) -> ImageWalker {
    ImageWalker::new(root)
}
