//! Synthetic precipitation rasters with hand-checkable values.

use precip_common::{CrsCode, GeoTransform, RasterGrid};

/// North-up EPSG:4326 raster with the given top-left corner and square cells.
pub fn raster(
    width: usize,
    height: usize,
    origin: (f64, f64),
    pixel_size: f64,
    data: Vec<f32>,
) -> RasterGrid {
    let transform = GeoTransform::north_up(origin.0, origin.1, pixel_size, pixel_size);
    match RasterGrid::new(width, height, data, transform, CrsCode::Epsg4326, None) {
        Ok(grid) => grid,
        Err(e) => panic!("invalid test raster: {}", e),
    }
}

/// North-up EPSG:4326 raster with every cell set to `value`.
pub fn uniform_raster(
    width: usize,
    height: usize,
    origin: (f64, f64),
    pixel_size: f64,
    value: f32,
) -> RasterGrid {
    raster(width, height, origin, pixel_size, vec![value; width * height])
}

/// North-up EPSG:4326 raster whose cells are `f(col, row)`.
pub fn raster_from_fn<F>(
    width: usize,
    height: usize,
    origin: (f64, f64),
    pixel_size: f64,
    f: F,
) -> RasterGrid
where
    F: Fn(usize, usize) -> f32,
{
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(f(col, row));
        }
    }
    raster(width, height, origin, pixel_size, data)
}
