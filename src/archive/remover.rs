//! Unconditional deletion of files and directory trees

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{ArchiveError, Result};

/// Delete `path`, whether it is a file, a symlink or a directory tree
pub fn remove_entry(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| ArchiveError::io(path, e))?;
    if metadata.is_dir() {
        remove_tree(path)
    } else {
        fs::remove_file(path).map_err(|e| ArchiveError::io(path, e))?;
        debug!(path = %path.display(), "Removed file");
        Ok(())
    }
}

/// Delete the directory `root` and everything beneath it.
///
/// Uses an explicit work list so depth is bounded by heap, not stack: every
/// directory is emptied of files first, then the directories themselves are
/// removed deepest-first.
pub fn remove_tree(root: &Path) -> Result<()> {
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];
    let mut walked = Vec::new();

    while let Some(dir) = pending.pop() {
        for item in fs::read_dir(&dir).map_err(|e| ArchiveError::io(&dir, e))? {
            let entry = item.map_err(|e| ArchiveError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| ArchiveError::io(entry.path(), e))?;

            if file_type.is_dir() {
                pending.push(entry.path());
            } else {
                fs::remove_file(entry.path()).map_err(|e| ArchiveError::io(entry.path(), e))?;
            }
        }
        walked.push(dir);
    }

    for dir in walked.into_iter().rev() {
        fs::remove_dir(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
    }

    debug!(path = %root.display(), "Removed directory tree");
    Ok(())
}
