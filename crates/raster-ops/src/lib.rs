//! Raster processing stages of the hourly precipitation pipeline.
//!
//! Each hourly tile goes through three stages, all operating on in-memory
//! [`RasterGrid`](precip_common::RasterGrid)s with a file-level wrapper that
//! reads and writes GeoTIFFs:
//!
//! ```text
//! source tile (GRIB2)
//!      │
//!      ▼
//! resample()            0.1° ──► target resolution, extent preserved
//!      │
//!      ▼
//! mask_and_crop()       cells outside the boundary ──► no-data,
//!      │                window cropped to the boundary extent
//!      ▼
//! compute_zonal_statistics()   one CSV row per zone
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_ops::{compute_zonal_statistics, mask_and_crop, parse_statistics, resample};
//!
//! let resampled = resample(&tile, 0.025, InterpolationMethod::Bilinear)?;
//! let masked = mask_and_crop(&resampled, &boundary, DEFAULT_NO_DATA)?;
//! let stats = parse_statistics("count min max mean")?;
//! let result = compute_zonal_statistics(&masked, &ugrhi, &stats, Some(&csv_path))?;
//! ```

pub mod error;
pub mod export;
pub mod interpolation;
pub mod mask;
pub mod rasterize;
pub mod reproject;
pub mod resample;
pub mod zonal;

pub use error::{RasterOpsError, Result};
pub use export::write_statistics_csv;
pub use interpolation::{bilinear_interpolate, cubic_interpolate, nearest_interpolate, InterpolationMethod};
pub use mask::{mask_and_crop, mask_file, MaskedRaster, DEFAULT_NO_DATA};
pub use rasterize::{rasterize_mask, rasterize_window, PixelWindow};
pub use reproject::{boundary_to_crs, reproject_geometry, zones_to_crs};
pub use resample::{resample, resample_file, target_dimension};
pub use zonal::{
    compute_zonal_statistics, parse_statistics, Statistic, ZonalStatisticsResult, ZoneRow,
    ZoneStatistics,
};
