//! Error types for raster and vector I/O.

use std::path::{Path, PathBuf};

use precip_common::{CrsParseError, GridError, ZoneSetError};
use thiserror::Error;

/// Errors that can occur while reading or writing rasters and vectors.
#[derive(Error, Debug)]
pub enum RasterIoError {
    /// The input file does not exist or cannot be opened.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Filesystem failure while reading or writing.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The GRIB2 message could not be decoded.
    #[error("GRIB2 decode error in {}: {message}", path.display())]
    Grib2Decode { path: PathBuf, message: String },

    /// The GeoTIFF could not be read or written.
    #[error("GeoTIFF error in {}: {message}", path.display())]
    GeoTiff { path: PathBuf, message: String },

    /// The shapefile or its sidecars could not be read.
    #[error("shapefile error in {}: {message}", path.display())]
    Shapefile { path: PathBuf, message: String },

    /// The id field is missing from the attribute table.
    #[error("field '{field}' not found in {}", path.display())]
    MissingField { path: PathBuf, field: String },

    /// Decoded pixels do not form a valid grid.
    #[error("invalid grid: {0}")]
    InvalidGrid(#[from] GridError),

    /// The zone set violates its invariants.
    #[error(transparent)]
    ZoneSet(#[from] ZoneSetError),

    /// The CRS tag or sidecar names an unsupported system.
    #[error("unsupported CRS: {0}")]
    Crs(#[from] CrsParseError),
}

impl RasterIoError {
    /// Map an open failure to `SourceNotFound` when the file is missing.
    pub fn open(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceNotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn grib2(path: &Path, message: impl Into<String>) -> Self {
        Self::Grib2Decode {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn geotiff(path: &Path, message: impl Into<String>) -> Self {
        Self::GeoTiff {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn shapefile(path: &Path, message: impl Into<String>) -> Self {
        Self::Shapefile {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Result type for raster I/O operations.
pub type Result<T> = std::result::Result<T, RasterIoError>;
