//! Error types for coordinate transformations.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// The point lies outside the domain of the projection.
    #[error("coordinate ({x}, {y}) is outside the valid domain of {projection}")]
    OutOfDomain { projection: String, x: f64, y: f64 },

    /// Input coordinates are NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}
