//! Error types for raster operations.

use std::path::PathBuf;

use precip_common::GridError;
use projection::ProjectionError;
use raster_io::RasterIoError;
use thiserror::Error;

/// Errors that can occur while resampling, masking or aggregating rasters.
#[derive(Error, Debug)]
pub enum RasterOpsError {
    /// The input raster or vector file could not be opened.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Target resolution is zero, negative or not finite.
    #[error("invalid target resolution: {0}")]
    InvalidResolution(f64),

    /// The boundary has no usable polygon.
    #[error("invalid mask geometry: {0}")]
    InvalidMaskGeometry(String),

    /// The zone set holds no polygon.
    #[error("zone set '{0}' contains no polygons")]
    EmptyZoneSet(String),

    /// A requested statistic name is not supported.
    #[error("unknown statistic '{0}'")]
    UnknownStatistic(String),

    /// An interpolation kernel name is not supported.
    #[error("unknown interpolation method '{0}'")]
    UnknownInterpolation(String),

    /// Vector geometries could not be brought into the raster CRS.
    #[error("cannot reproject from {from} to {to}: {source}")]
    CrsReconciliation {
        from: String,
        to: String,
        #[source]
        source: ProjectionError,
    },

    /// The raster is not usable for the operation.
    #[error("invalid grid: {0}")]
    InvalidGrid(#[from] GridError),

    /// An input raster or vector could not be decoded.
    #[error(transparent)]
    Input(RasterIoError),

    /// An output artifact could not be written.
    #[error("failed to write {}: {source}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: RasterIoError,
    },
}

impl RasterOpsError {
    pub fn invalid_mask_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidMaskGeometry(msg.into())
    }

    pub fn io_write(path: &std::path::Path, source: RasterIoError) -> Self {
        Self::IoWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn crs_reconciliation(
        from: impl ToString,
        to: impl ToString,
        source: ProjectionError,
    ) -> Self {
        Self::CrsReconciliation {
            from: from.to_string(),
            to: to.to_string(),
            source,
        }
    }
}

/// Read-side conversion; write paths use [`RasterOpsError::io_write`].
impl From<RasterIoError> for RasterOpsError {
    fn from(err: RasterIoError) -> Self {
        match err {
            RasterIoError::SourceNotFound(path) => Self::SourceNotFound(path),
            RasterIoError::InvalidGrid(e) => Self::InvalidGrid(e),
            other => Self::Input(other),
        }
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterOpsError>;
