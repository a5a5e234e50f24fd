//! Coordinate reference system transformations.
//!
//! Implements the handful of map projections the pipeline needs from
//! scratch, without external dependencies:
//! - geographic lon/lat on WGS84, SIRGAS 2000 and SAD69
//! - Web Mercator
//! - Transverse Mercator (UTM zones)

pub mod ellipsoid;
pub mod error;
pub mod geographic;
pub mod mercator;
pub mod transform;
pub mod transverse_mercator;

pub use ellipsoid::Ellipsoid;
pub use error::ProjectionError;
pub use mercator::WebMercator;
pub use transform::CrsTransform;
pub use transverse_mercator::TransverseMercator;
