//! Common types shared across the hourly precipitation pipeline crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod identity;
pub mod zones;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsParseError, Datum};
pub use error::{GridError, GridResult};
pub use grid::{GeoTransform, RasterGrid};
pub use identity::{IdentityError, TileIdentity};
pub use zones::{Boundary, PolygonZoneSet, Zone, ZoneSetError};
