//! GRIB2 source tiles.
//!
//! Hourly precipitation tiles are single-message GRIB2 files on a regular
//! lat/lon grid. Decoding is delegated to the `grib` crate; this module only
//! turns the first submessage into a north-up [`RasterGrid`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use precip_common::{CrsCode, GeoTransform, RasterGrid};
use tracing::debug;

use crate::error::{RasterIoError, Result};

/// Read the first field of a GRIB2 file as a north-up grid in EPSG:4326.
///
/// Missing values (bitmap-masked points) decode to NaN, which every
/// downstream operation treats as no-data.
pub fn read_grib2(path: &Path) -> Result<RasterGrid> {
    let file = File::open(path).map_err(|e| RasterIoError::open(path, e))?;
    let grib2 = grib::from_reader(BufReader::new(file))
        .map_err(|e| RasterIoError::grib2(path, e.to_string()))?;

    let (index, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| RasterIoError::grib2(path, "file holds no GRIB2 message"))?;

    let (ni, nj) = submessage
        .grid_shape()
        .map_err(|e| RasterIoError::grib2(path, e.to_string()))?;
    let latlons: Vec<(f32, f32)> = submessage
        .latlons()
        .map_err(|e| RasterIoError::grib2(path, e.to_string()))?
        .collect();

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| RasterIoError::grib2(path, e.to_string()))?;
    let values: Vec<f32> = decoder
        .dispatch()
        .map_err(|e| RasterIoError::grib2(path, e.to_string()))?
        .collect();

    debug!(
        path = %path.display(),
        message = ?index,
        ni,
        nj,
        "decoded GRIB2 field"
    );

    let grid = grid_from_scan(ni, nj, &latlons, values).map_err(|m| RasterIoError::grib2(path, m))?;
    Ok(grid)
}

/// Arrange scan-ordered values into a north-up grid.
///
/// `latlons` gives the `(lat, lon)` of every point in scan order, with the
/// i (longitude) index varying fastest.
pub(crate) fn grid_from_scan(
    ni: usize,
    nj: usize,
    latlons: &[(f32, f32)],
    mut values: Vec<f32>,
) -> std::result::Result<RasterGrid, String> {
    if ni < 2 || nj < 2 {
        return Err(format!("grid {}x{} is too small to georeference", ni, nj));
    }
    let n = ni * nj;
    if latlons.len() != n || values.len() < n {
        return Err(format!(
            "expected {} points, got {} coordinates and {} values",
            n,
            latlons.len(),
            values.len()
        ));
    }

    // A bitmap is padded to whole octets and the decoder yields one value per bit
    values.truncate(n);

    let (lat0, lon0) = to_degrees(latlons[0]);
    let (lat_i, lon_i) = to_degrees(latlons[ni - 1]);
    let (lat_j, lon_j) = to_degrees(latlons[ni * (nj - 1)]);

    if lat_i != lat0 || lon_j != lon0 {
        return Err("only i-consecutive regular lat/lon grids are supported".to_string());
    }

    let dx = (lon_i - lon0) / (ni - 1) as f64;
    let dy = (lat_j - lat0) / (nj - 1) as f64;
    if dx == 0.0 || dy == 0.0 {
        return Err("degenerate grid spacing".to_string());
    }

    let flip_rows = dy > 0.0;
    let flip_cols = dx < 0.0;
    let mut data = Vec::with_capacity(n);
    for row in 0..nj {
        let src_row = if flip_rows { nj - 1 - row } else { row };
        for col in 0..ni {
            let src_col = if flip_cols { ni - 1 - col } else { col };
            data.push(values[src_row * ni + src_col]);
        }
    }

    let west = normalize_lon(lon0.min(lon_i));
    let north = lat0.max(lat_j);
    let (pw, ph) = (dx.abs(), dy.abs());
    let transform = GeoTransform::north_up(west - pw / 2.0, north + ph / 2.0, pw, ph);

    RasterGrid::new(ni, nj, data, transform, CrsCode::Epsg4326, None).map_err(|e| e.to_string())
}

/// Coordinates arrive as f32; snap to 1e-5° to drop the rounding noise.
fn to_degrees((lat, lon): (f32, f32)) -> (f64, f64) {
    let snap = |v: f32| (v as f64 * 1e5).round() / 1e5;
    (snap(lat), snap(lon))
}

fn normalize_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(ni: usize, nj: usize, lat0: f32, lon0: f32, dlat: f32, dlon: f32) -> Vec<(f32, f32)> {
        let mut pts = Vec::with_capacity(ni * nj);
        for j in 0..nj {
            for i in 0..ni {
                pts.push((lat0 + j as f32 * dlat, lon0 + i as f32 * dlon));
            }
        }
        pts
    }

    #[test]
    fn test_north_to_south_scan_is_kept() {
        let pts = scan(3, 2, -20.0, 310.0, -0.5, 0.5);
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let grid = grid_from_scan(3, 2, &pts, values.clone()).unwrap();

        assert_eq!(grid.data(), values.as_slice());
        let t = grid.transform();
        assert!((t.origin_x - (-50.25)).abs() < 1e-9);
        assert!((t.origin_y - (-19.75)).abs() < 1e-9);
        assert_eq!(t.pixel_size(), (0.5, 0.5));
        assert_eq!(grid.crs(), CrsCode::Epsg4326);
    }

    #[test]
    fn test_south_to_north_scan_is_flipped() {
        let pts = scan(2, 3, -21.0, -50.0, 0.5, 0.5);
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let grid = grid_from_scan(2, 3, &pts, values).unwrap();

        // Top row is the northernmost scan line
        assert_eq!(grid.data(), &[5.0, 6.0, 3.0, 4.0, 1.0, 2.0]);
        assert!((grid.transform().origin_y - (-19.75)).abs() < 1e-9);
    }

    #[test]
    fn test_point_count_mismatch() {
        let pts = scan(2, 2, 0.0, 0.0, -1.0, 1.0);
        assert!(grid_from_scan(2, 2, &pts, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_bitmap_padding_is_dropped() {
        let pts = scan(2, 2, 0.0, 0.0, -1.0, 1.0);
        let mut values = vec![1.0, f32::NAN, 3.0, 4.0];
        values.extend([f32::NAN; 4]);
        let grid = grid_from_scan(2, 2, &pts, values).unwrap();
        assert_eq!(grid.data().len(), 4);
        assert_eq!(grid.valid_count(), 3);
        assert_eq!(grid.data()[3], 4.0);
    }

    #[test]
    fn test_single_column_rejected() {
        let pts = scan(1, 4, 0.0, 0.0, -1.0, 1.0);
        assert!(grid_from_scan(1, 4, &pts, vec![0.0; 4]).is_err());
    }
}
