//! Upload Staging Helpers
//!
//! Backend-agnostic directory traversal used when staging a local pipeline
//! directory to object storage. Version-control metadata directories are
//! skipped; everything else is uploaded with its path relative to the
//! directory root.

use std::path::{Path, PathBuf};

use crate::error::{LaunchError, Result};

/// Returns all file paths under `root`, skipping any directory whose name
/// appears in `exclude_dirs`.
pub fn iter_directory_files(root: &Path, exclude_dirs: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(root, exclude_dirs, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, exclude_dirs: &[&str], files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| LaunchError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| LaunchError::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            let name = entry.file_name();
            if exclude_dirs.iter().any(|ex| name == std::ffi::OsStr::new(ex)) {
                continue;
            }
            collect_files(&path, exclude_dirs, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }

    Ok(())
}

/// Rewrites `files` relative to the `base` directory.
///
/// Files outside `base` are returned unchanged; callers are expected to pass
/// paths produced by [`iter_directory_files`] over the same root.
pub fn relative_paths(files: &[PathBuf], base: &Path) -> Vec<PathBuf> {
    files
        .iter()
        .map(|f| f.strip_prefix(base).map(Path::to_path_buf).unwrap_or_else(|_| f.clone()))
        .collect()
}
