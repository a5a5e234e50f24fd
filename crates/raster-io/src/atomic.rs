//! Write-then-rename helper for output artifacts.

use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{RasterIoError, Result};

/// Write `path` through a temp file in the same directory.
///
/// The closure writes the full content into the temp file. The file is
/// synced and renamed over `path` only if the closure succeeds; otherwise the
/// temp file is removed when dropped and `path` is left untouched.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RasterIoError::io(dir, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| RasterIoError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| RasterIoError::io(path, e.error))?;

    tracing::trace!(path = %path.display(), "artifact persisted");
    Ok(())
}
