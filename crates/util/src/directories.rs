//! Directory preparation used at the start of a run.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// Create `path` (and parents) when it does not exist yet.
pub fn ensure_directory(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Empty `path`, creating it when absent.
///
/// Files and sub-directories are removed synchronously; the call returns only
/// once the directory is empty. Returns the number of entries removed.
pub fn clean_directory(path: &Path) -> io::Result<usize> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&entry_path)?;
        } else {
            fs::remove_file(&entry_path)?;
        }
        removed += 1;
    }
    debug!(path = %path.display(), removed, "cleaned directory");
    Ok(removed)
}
