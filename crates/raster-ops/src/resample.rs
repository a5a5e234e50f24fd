//! Re-gridding to a target ground resolution.

use std::path::Path;

use precip_common::{GeoTransform, RasterGrid};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{RasterOpsError, Result};
use crate::interpolation::InterpolationMethod;

/// Output dimensions for re-gridding `dim` cells of `pixel_size` to `target`.
///
/// The extent is preserved, so the count is rounded and never drops below one.
pub fn target_dimension(dim: usize, pixel_size: f64, target: f64) -> usize {
    ((dim as f64 * pixel_size / target).round() as usize).max(1)
}

/// Re-grid `source` to square cells of `target_resolution` CRS units.
///
/// The geographic extent is kept: each output cell is `extent / new_dim`
/// wide, which equals `target_resolution` whenever the extent is a whole
/// multiple of it. Output cells are sampled at their centres (GDAL pixel
/// convention) and no-data in the source is treated as missing. Cells with
/// no valid neighbour carry the source no-data value.
pub fn resample(
    source: &RasterGrid,
    target_resolution: f64,
    method: InterpolationMethod,
) -> Result<RasterGrid> {
    if !target_resolution.is_finite() || target_resolution <= 0.0 {
        return Err(RasterOpsError::InvalidResolution(target_resolution));
    }
    source.ensure_axis_aligned()?;

    let (src_w, src_h) = (source.width(), source.height());
    let (pw, ph) = source.transform().pixel_size();
    let dst_w = target_dimension(src_w, pw, target_resolution);
    let dst_h = target_dimension(src_h, ph, target_resolution);

    // Source values with every no-data cell normalised to NaN
    let src: Vec<f32> = source
        .data()
        .iter()
        .map(|&v| if source.is_no_data(v) { f32::NAN } else { v })
        .collect();

    let scale_x = src_w as f64 / dst_w as f64;
    let scale_y = src_h as f64 / dst_h as f64;
    let fill = source.fill_value();

    let mut output = vec![fill; dst_w * dst_h];
    output
        .par_chunks_mut(dst_w)
        .enumerate()
        .for_each(|(row, out_row)| {
            let sy = (row as f64 + 0.5) * scale_y - 0.5;
            for (col, out) in out_row.iter_mut().enumerate() {
                let sx = (col as f64 + 0.5) * scale_x - 0.5;
                let v = method.sample(&src, src_w, src_h, sx, sy);
                if !v.is_nan() {
                    *out = v;
                }
            }
        });

    let t = source.transform();
    let transform = GeoTransform {
        origin_x: t.origin_x,
        pixel_width: t.pixel_width * scale_x,
        row_rotation: 0.0,
        origin_y: t.origin_y,
        col_rotation: 0.0,
        pixel_height: t.pixel_height * scale_y,
    };

    debug!(
        src_width = src_w,
        src_height = src_h,
        dst_width = dst_w,
        dst_height = dst_h,
        method = %method,
        "resampled grid"
    );

    let grid = RasterGrid::new(dst_w, dst_h, output, transform, source.crs(), source.no_data())?;
    Ok(grid)
}

/// Resample the raster at `input` and write it as a Float32 GeoTIFF.
///
/// The input is never modified; the output replaces `output` atomically.
pub fn resample_file(
    input: &Path,
    output: &Path,
    target_resolution: f64,
    method: InterpolationMethod,
) -> Result<RasterGrid> {
    if !target_resolution.is_finite() || target_resolution <= 0.0 {
        return Err(RasterOpsError::InvalidResolution(target_resolution));
    }

    let source = raster_io::read_raster(input)?;
    let grid = resample(&source, target_resolution, method)?;
    raster_io::write_geotiff(output, &grid).map_err(|e| RasterOpsError::io_write(output, e))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        width = grid.width(),
        height = grid.height(),
        "resampled raster written"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use precip_common::CrsCode;

    fn grid(width: usize, height: usize, pixel: f64, data: Vec<f32>, no_data: Option<f64>) -> RasterGrid {
        RasterGrid::new(
            width,
            height,
            data,
            GeoTransform::north_up(-50.0, -20.0, pixel, pixel),
            CrsCode::Epsg4326,
            no_data,
        )
        .unwrap()
    }

    #[test]
    fn test_target_dimension() {
        assert_eq!(target_dimension(10, 0.1, 0.025), 40);
        assert_eq!(target_dimension(3, 0.1, 0.04), 8); // 7.5 rounds up
        assert_eq!(target_dimension(2, 0.1, 5.0), 1);
    }

    #[test]
    fn test_uniform_field_is_preserved() {
        let src = grid(10, 10, 0.1, vec![5.0; 100], None);
        for method in [
            InterpolationMethod::Nearest,
            InterpolationMethod::Bilinear,
            InterpolationMethod::Cubic,
        ] {
            let out = resample(&src, 0.025, method).unwrap();
            assert_eq!((out.width(), out.height()), (40, 40));
            assert!(out.data().iter().all(|v| (*v - 5.0).abs() < 1e-6), "{}", method);
            assert!(out.bounds().approx_eq(&src.bounds(), 1e-9), "{}", method);
        }
    }

    #[test]
    fn test_extent_kept_when_not_a_multiple() {
        let src = grid(3, 3, 0.1, vec![1.0; 9], None);
        let out = resample(&src, 0.04, InterpolationMethod::Bilinear).unwrap();
        assert_eq!(out.width(), 8);
        assert!(out.bounds().approx_eq(&src.bounds(), 1e-9));
        assert!((out.transform().pixel_width - 0.0375).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_upsampling_replicates_cells() {
        let src = grid(2, 1, 1.0, vec![1.0, 2.0], None);
        let out = resample(&src, 0.5, InterpolationMethod::Nearest).unwrap();
        assert_eq!(out.data(), &[1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_no_data_is_not_spread() {
        let src = grid(2, 2, 1.0, vec![-9999.0, 4.0, 4.0, 4.0], Some(-9999.0));
        let out = resample(&src, 0.5, InterpolationMethod::Bilinear).unwrap();
        // The corner cell sits on the missing centre; everything else is
        // renormalised over valid neighbours and never mixes in the sentinel
        assert_eq!(out.data()[0], -9999.0);
        assert!(out.data()[1..].iter().all(|v| (*v - 4.0).abs() < 1e-6));
        assert_eq!(out.no_data(), Some(-9999.0));
    }

    #[test]
    fn test_all_missing_yields_no_data() {
        let src = grid(2, 2, 1.0, vec![f32::NAN; 4], None);
        let out = resample(&src, 0.5, InterpolationMethod::Bilinear).unwrap();
        assert_eq!(out.valid_count(), 0);
    }

    #[test]
    fn test_invalid_resolution() {
        let src = grid(2, 2, 1.0, vec![0.0; 4], None);
        for bad in [0.0, -0.025, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resample(&src, bad, InterpolationMethod::Bilinear),
                Err(RasterOpsError::InvalidResolution(_))
            ));
        }
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resample_file(
            &dir.path().join("MERGE_CPTEC_2025011513.grib2"),
            &dir.path().join("2025-01-15-13.tif"),
            0.025,
            InterpolationMethod::Bilinear,
        )
        .unwrap_err();
        assert!(matches!(err, RasterOpsError::SourceNotFound(_)));
    }
}
