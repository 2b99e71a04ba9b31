//! Filesystem prober and removal helpers shared by installers and the pruner.
//!
//! Probes are read-only.  Symbolic links are never reported as
//! subdirectories, so no walk built on [`list_subdirectories`] leaves the
//! tree it started in.
use std::path::{Path, PathBuf};

use crate::resources::error::ResourceError;

/// Name of the version-control metadata directory.
pub const VCS_DIR: &str = ".git";

fn io_error(path: &Path, source: std::io::Error) -> ResourceError {
    ResourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Return `true` if anything (including a dangling symlink) exists at `path`.
#[must_use]
pub fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Return `true` if `path` is a directory with no entries at all.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] if the directory cannot be read.
pub fn is_empty_dir(path: &Path) -> Result<bool, ResourceError> {
    let mut entries = std::fs::read_dir(path).map_err(|e| io_error(path, e))?;
    Ok(entries.next().is_none())
}

/// Return `true` if `path` directly contains version-control metadata.
#[must_use]
pub fn has_vcs_metadata(path: &Path) -> bool {
    path.join(VCS_DIR).exists()
}

/// Return `true` if `path` directly contains a file named `name`.
#[must_use]
pub fn contains_file(path: &Path, name: &str) -> bool {
    path.join(name).is_file()
}

/// List the immediate subdirectories of `path`, sorted by name.
///
/// Entries are classified without following symlinks.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] if the directory or one of its entries
/// cannot be read.
pub fn list_subdirectories(path: &Path) -> Result<Vec<PathBuf>, ResourceError> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| io_error(path, e))? {
        let entry = entry.map_err(|e| io_error(path, e))?;
        let file_type = entry.file_type().map_err(|e| io_error(&entry.path(), e))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Remove whatever is at `path`: a directory tree, a file, or a symlink.
///
/// A symlink is unlinked, never followed.  Does nothing if `path` does not
/// exist.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] if the path exists but cannot be removed.
pub fn remove_tree(path: &Path) -> Result<(), ResourceError> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(io_error(path, e)),
        _ => Ok(()),
    }
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), ResourceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    Ok(())
}

/// Create `path` and any missing ancestors.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), ResourceError> {
    std::fs::create_dir_all(path).map_err(|e| io_error(path, e))
}
