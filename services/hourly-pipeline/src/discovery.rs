//! Source tile discovery in the dated `<YYYY>/<MM>/<DD>/` tree.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directory holding the tiles of `date`.
pub fn tile_directory(source_root: &Path, date: NaiveDate) -> PathBuf {
    source_root
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}", date.day()))
}

/// Files directly inside `dir` whose extension is `extension`, sorted by name.
///
/// A missing directory yields no candidates.
pub fn discover_tiles(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        info!(dir = %dir.display(), "source directory not found, nothing to process");
        return Vec::new();
    }

    let mut tiles: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();

    tiles.sort();
    debug!(dir = %dir.display(), count = tiles.len(), "discovered tiles");
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_tile_directory_layout() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(
            tile_directory(Path::new("/data/merge"), date),
            PathBuf::from("/data/merge/2025/01/05")
        );
    }

    #[test]
    fn test_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "MERGE_CPTEC_2025011514.grib2",
            "MERGE_CPTEC_2025011500.grib2",
            "MERGE_CPTEC_2025011513.grib2.idx",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.grib2")).unwrap();

        let tiles = discover_tiles(dir.path(), "grib2");
        let names: Vec<_> = tiles
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["MERGE_CPTEC_2025011500.grib2", "MERGE_CPTEC_2025011514.grib2"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_tiles(&dir.path().join("2025/01/15"), "grib2").is_empty());
    }
}
