//! Relocation of single files and whole directory trees into an archive

use std::fs::{self, File, FileTimes};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{ArchiveError, Result};

/// Upper bound on `name.N.ext` candidates before a file move is abandoned
pub const MAX_NAME_ATTEMPTS: u32 = 100_000;

/// Move `source` into `dest_dir`, keeping its name when free and otherwise
/// inserting a counter before the extension (`app.log` -> `app.1.log`).
///
/// Returns the final destination path.
pub fn move_file(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    move_file_with_limit(source, dest_dir, MAX_NAME_ATTEMPTS)
}

/// [`move_file`] giving up after `limit` candidate names
pub fn move_file_with_limit(source: &Path, dest_dir: &Path, limit: u32) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| ArchiveError::io(source, io::Error::from(ErrorKind::InvalidInput)))?;
    let target = free_destination_with_limit(dest_dir, &name.to_string_lossy(), limit)?;

    relocate_file(source, &target).map_err(|e| ArchiveError::io(source, e))?;
    debug!(from = %source.display(), to = %target.display(), "Moved file");
    Ok(target)
}

/// Move the tree rooted at `source` so that it lives at `target`.
///
/// Walks with an explicit work list, mirroring each directory under `target`
/// and moving its files across. Files already present at the destination are
/// replaced. Once every file has moved, the emptied source directories are
/// removed. A failure part-way leaves both trees partially populated.
pub fn move_directory(source: &Path, target: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(source).map_err(|e| ArchiveError::io(source, e))?;
    if !metadata.is_dir() {
        return Err(ArchiveError::NotADirectory(source.to_path_buf()));
    }

    let mut pending = vec![(source.to_path_buf(), target.to_path_buf())];
    let mut walked = Vec::new();

    while let Some((from_dir, to_dir)) = pending.pop() {
        fs::create_dir_all(&to_dir).map_err(|e| ArchiveError::io(&to_dir, e))?;

        let mut subdirs = Vec::new();
        for item in fs::read_dir(&from_dir).map_err(|e| ArchiveError::io(&from_dir, e))? {
            let entry = item.map_err(|e| ArchiveError::io(&from_dir, e))?;
            let file_type = entry.file_type().map_err(|e| ArchiveError::io(entry.path(), e))?;
            let to = to_dir.join(entry.file_name());

            if file_type.is_dir() {
                subdirs.push((entry.path(), to));
            } else {
                replace_file(&entry.path(), &to)?;
            }
        }

        pending.extend(subdirs);
        walked.push(from_dir);
    }

    // Pre-order walk reversed: children are removed before their parents
    for dir in walked.into_iter().rev() {
        fs::remove_dir(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
    }

    debug!(from = %source.display(), to = %target.display(), "Moved directory tree");
    Ok(())
}

/// First free path among `dest_dir/name`, `dest_dir/stem.1.ext`, `dest_dir/stem.2.ext`, ...
pub fn free_destination(dest_dir: &Path, name: &str) -> Result<PathBuf> {
    free_destination_with_limit(dest_dir, name, MAX_NAME_ATTEMPTS)
}

/// Like [`free_destination`]; `limit` counts the plain name as the first candidate
pub fn free_destination_with_limit(dest_dir: &Path, name: &str, limit: u32) -> Result<PathBuf> {
    let candidate = dest_dir.join(name);
    if is_free(&candidate)? {
        return Ok(candidate);
    }

    for n in 1..limit {
        let candidate = dest_dir.join(numbered_name(name, n));
        if is_free(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(ArchiveError::DisambiguationExhausted {
        name: name.to_string(),
        limit,
    })
}

/// `stem.N.ext`, or `name.N` when the name has no extension
pub fn numbered_name(name: &str, n: u32) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            format!("{}.{}.{}", stem.to_string_lossy(), n, ext.to_string_lossy())
        }
        _ => format!("{}.{}", name, n),
    }
}

fn is_free(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(ArchiveError::io(path, e)),
    }
}

fn replace_file(from: &Path, to: &Path) -> Result<()> {
    match fs::symlink_metadata(to) {
        Ok(existing) if !existing.is_dir() => {
            fs::remove_file(to).map_err(|e| ArchiveError::io(to, e))?;
        }
        _ => {}
    }
    relocate_file(from, to).map_err(|e| ArchiveError::io(from, e))
}

/// Rename, falling back to copy + remove across filesystems
fn relocate_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            let modified = fs::metadata(from)?.modified()?;
            fs::copy(from, to)?;
            // keep the original age so archive retention still applies
            File::options()
                .write(true)
                .open(to)?
                .set_times(FileTimes::new().set_modified(modified))?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
