//! File adapters for the hourly precipitation pipeline.
//!
//! - [`grib2`]: source tiles (first GRIB2 field on a regular lat/lon grid)
//! - [`geotiff`]: intermediate and final Float32 rasters
//! - [`vector`]: boundary and zone shapefiles
//!
//! All outputs are written through [`write_atomically`], so a reader never
//! observes a half-written artifact under its final name.

pub mod atomic;
pub mod error;
pub mod geotiff;
pub mod grib2;
pub mod vector;

pub use atomic::write_atomically;
pub use error::{RasterIoError, Result};
pub use geotiff::{read_geotiff, write_geotiff};
pub use grib2::read_grib2;
pub use vector::{load_boundary, load_zone_set, read_prj};

use std::path::Path;

use precip_common::RasterGrid;

/// Read a source raster, choosing the decoder from the file extension.
///
/// `.tif`/`.tiff` go through the GeoTIFF reader, everything else is treated
/// as GRIB2.
pub fn read_raster(path: &Path) -> Result<RasterGrid> {
    let is_tiff = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false);

    if is_tiff {
        read_geotiff(path)
    } else {
        read_grib2(path)
    }
}
