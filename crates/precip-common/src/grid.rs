//! Georeferenced raster grids.

use crate::error::{GridError, GridResult};
use crate::{BoundingBox, CrsCode};
use serde::{Deserialize, Serialize};

/// Affine transform from pixel (col, row) space to CRS coordinates.
///
/// Terms follow the GDAL geotransform order:
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * col_rotation + row * pixel_height`
///
/// `(col, row)` are pixel-edge coordinates, so `(0, 0)` is the outer corner
/// of the first cell and `(0.5, 0.5)` its centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    /// Negative for north-up grids
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform anchored at the top-left corner.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    /// Create from the six GDAL coefficients.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            row_rotation: gt[2],
            origin_y: gt[3],
            col_rotation: gt[4],
            pixel_height: gt[5],
        }
    }

    /// The six GDAL coefficients.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// True when both rotation terms are zero.
    pub fn is_axis_aligned(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// Ground size of one cell as (width, height), both positive.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    /// Map fractional pixel coordinates to CRS coordinates.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Map CRS coordinates to fractional pixel coordinates.
    ///
    /// Only valid for axis-aligned transforms.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Centre of cell `(col, row)` in CRS coordinates.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Extent covered by a `width` x `height` grid using this transform.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let corners = [
            self.pixel_to_world(0.0, 0.0),
            self.pixel_to_world(width as f64, 0.0),
            self.pixel_to_world(0.0, height as f64),
            self.pixel_to_world(width as f64, height as f64),
        ];
        // Four corners are never empty
        BoundingBox::from_points(corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// A single-band raster: values, georeferencing and the no-data sentinel.
///
/// Values are stored row-major starting at the top-left cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
    transform: GeoTransform,
    crs: CrsCode,
    no_data: Option<f64>,
}

impl RasterGrid {
    /// Create a grid, checking that `data` matches the declared dimensions.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
        crs: CrsCode,
        no_data: Option<f64>,
    ) -> GridResult<Self> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty);
        }
        let expected = width * height;
        if data.len() != expected {
            return Err(GridError::DimensionMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        if !(transform.pixel_width.is_finite() && transform.pixel_width != 0.0)
            || !(transform.pixel_height.is_finite() && transform.pixel_height != 0.0)
        {
            return Err(GridError::InvalidPixelSize(format!(
                "{} x {}",
                transform.pixel_width, transform.pixel_height
            )));
        }

        Ok(Self {
            width,
            height,
            data,
            transform,
            crs,
            no_data,
        })
    }

    /// Grid with every cell set to `value`.
    pub fn filled(
        width: usize,
        height: usize,
        value: f32,
        transform: GeoTransform,
        crs: CrsCode,
        no_data: Option<f64>,
    ) -> GridResult<Self> {
        Self::new(width, height, vec![value; width * height], transform, crs, no_data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    /// Value at `(col, row)`, `None` outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Whether `value` is the no-data sentinel or NaN.
    pub fn is_no_data(&self, value: f32) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.no_data {
            Some(nd) => value == nd as f32,
            None => false,
        }
    }

    /// Value used to fill cells that carry no measurement.
    pub fn fill_value(&self) -> f32 {
        self.no_data.map(|nd| nd as f32).unwrap_or(f32::NAN)
    }

    /// Geographic or projected extent of the grid.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Fail unless the transform has no rotation terms.
    pub fn ensure_axis_aligned(&self) -> GridResult<()> {
        if self.transform.is_axis_aligned() {
            Ok(())
        } else {
            Err(GridError::Rotated {
                row_rotation: self.transform.row_rotation,
                col_rotation: self.transform.col_rotation,
            })
        }
    }

    /// Count of cells holding a measurement.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_no_data(**v)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_like_transform() -> GeoTransform {
        GeoTransform::north_up(-60.0, 10.0, 0.1, 0.1)
    }

    #[test]
    fn test_new_rejects_mismatched_data() {
        let err = RasterGrid::new(3, 2, vec![0.0; 5], merge_like_transform(), CrsCode::Epsg4326, None)
            .unwrap_err();
        assert!(matches!(
            err,
            GridError::DimensionMismatch {
                expected: 6,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_new_rejects_empty_grid() {
        let err = RasterGrid::new(0, 2, vec![], merge_like_transform(), CrsCode::Epsg4326, None)
            .unwrap_err();
        assert!(matches!(err, GridError::Empty));
    }

    #[test]
    fn test_bounds() {
        let grid = RasterGrid::filled(10, 5, 1.0, merge_like_transform(), CrsCode::Epsg4326, None)
            .unwrap();
        let bbox = grid.bounds();
        assert!(bbox.approx_eq(&BoundingBox::new(-60.0, 9.5, -59.0, 10.0), 1e-9));
    }

    #[test]
    fn test_cell_center_and_world_to_pixel() {
        let gt = merge_like_transform();
        let (x, y) = gt.cell_center(0, 0);
        assert!((x - -59.95).abs() < 1e-9);
        assert!((y - 9.95).abs() < 1e-9);

        let (col, row) = gt.world_to_pixel(x, y);
        assert!((col - 0.5).abs() < 1e-9);
        assert!((row - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_data_detection() {
        let grid = RasterGrid::new(
            2,
            1,
            vec![0.0, 3.5],
            merge_like_transform(),
            CrsCode::Epsg4326,
            Some(0.0),
        )
        .unwrap();
        assert!(grid.is_no_data(0.0));
        assert!(grid.is_no_data(f32::NAN));
        assert!(!grid.is_no_data(3.5));
        assert_eq!(grid.valid_count(), 1);
    }

    #[test]
    fn test_gdal_roundtrip() {
        let gt = GeoTransform::from_gdal([-53.1, 0.025, 0.0, -19.7, 0.0, -0.025]);
        assert_eq!(gt.to_gdal(), [-53.1, 0.025, 0.0, -19.7, 0.0, -0.025]);
        assert!(gt.is_axis_aligned());
        assert_eq!(gt.pixel_size(), (0.025, 0.025));
    }
}
