//! Error types for raster grid construction.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised when a raster grid violates its structural invariants.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid data has {actual} cells but {width}x{height} requires {expected}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("grid has zero width or height")]
    Empty,

    #[error("rotated geotransforms are not supported (terms {row_rotation}, {col_rotation})")]
    Rotated { row_rotation: f64, col_rotation: f64 },

    #[error("invalid pixel size: {0}")]
    InvalidPixelSize(String),
}
