use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// How a destination file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Linked,
    Copied,
}

/// Place `source` at `dest`, as a symlink when `use_link` is set and the
/// platform allows it, otherwise as a copy.
pub fn link_or_copy(source: &Path, dest: &Path, use_link: bool) -> io::Result<Materialized> {
    if use_link {
        match try_symlink(source, dest) {
            Ok(()) => return Ok(Materialized::Linked),
            Err(err) => debug!(
                src = %source.display(),
                dst = %dest.display(),
                error = %err,
                "Symlink unavailable, copying instead"
            ),
        }
    }
    copy_with_metadata(source, dest)?;
    Ok(Materialized::Copied)
}

fn try_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::canonicalize(source)?;
    symlink_file(&target, dest)
}

#[cfg(unix)]
fn symlink_file(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(windows)]
fn symlink_file(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, dest)
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(_target: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// Copy bytes and permissions, then carry over the modification time.
pub fn copy_with_metadata(source: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(source, dest)?;
    let modified = fs::metadata(source)?.modified()?;
    // Read-only copies can't be opened for writing; the timestamp is best effort.
    if let Ok(file) = fs::OpenOptions::new().write(true).open(dest) {
        let _ = file.set_modified(modified);
    }
    Ok(())
}
