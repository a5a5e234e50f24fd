//! Polygon rasterization onto a pixel grid.
//!
//! A cell is covered when its centre lies inside the polygon (the GDAL
//! default without ALL_TOUCHED). Each polygon is filled with the even-odd
//! rule over all of its rings so holes are left out; the parts of a
//! multi-polygon are OR-ed together.

use geo::{BoundingRect, MultiPolygon, Polygon};
use precip_common::{BoundingBox, GeoTransform};

/// A rectangular block of cells of a larger grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: i64,
    pub row_off: i64,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            col_off: 0,
            row_off: 0,
            width,
            height,
        }
    }

    /// Smallest window whose cells cover `bbox`, snapped outward to the grid.
    ///
    /// The window is not clipped to any raster; it may be empty.
    pub fn covering(transform: &GeoTransform, bbox: &BoundingBox) -> Self {
        // Tolerance so that edges sitting exactly on a grid line do not
        // pull in an extra column through floating point noise
        const EPS: f64 = 1e-9;

        let (c0, r0) = transform.world_to_pixel(bbox.min_x, bbox.max_y);
        let (c1, r1) = transform.world_to_pixel(bbox.max_x, bbox.min_y);
        let (cmin, cmax) = (c0.min(c1), c0.max(c1));
        let (rmin, rmax) = (r0.min(r1), r0.max(r1));

        let col_off = (cmin + EPS).floor() as i64;
        let row_off = (rmin + EPS).floor() as i64;
        let col_end = (cmax - EPS).ceil() as i64;
        let row_end = (rmax - EPS).ceil() as i64;

        Self {
            col_off,
            row_off,
            width: (col_end - col_off).max(0) as usize,
            height: (row_end - row_off).max(0) as usize,
        }
    }

    /// Intersection with a `width` x `height` grid.
    pub fn clip(&self, width: usize, height: usize) -> Self {
        let c0 = self.col_off.clamp(0, width as i64);
        let r0 = self.row_off.clamp(0, height as i64);
        let c1 = (self.col_off + self.width as i64).clamp(0, width as i64);
        let r1 = (self.row_off + self.height as i64).clamp(0, height as i64);
        Self {
            col_off: c0,
            row_off: r0,
            width: (c1 - c0) as usize,
            height: (r1 - r0) as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Transform of a grid whose first cell is this window's first cell.
    pub fn transform(&self, parent: &GeoTransform) -> GeoTransform {
        let (origin_x, origin_y) = parent.pixel_to_world(self.col_off as f64, self.row_off as f64);
        GeoTransform {
            origin_x,
            origin_y,
            ..*parent
        }
    }
}

/// Burn 1 into a `window`-shaped mask for every cell centre inside `geometry`.
///
/// `transform` is the transform of the full grid the window belongs to.
pub fn rasterize_window(
    geometry: &MultiPolygon<f64>,
    transform: &GeoTransform,
    window: PixelWindow,
) -> Vec<u8> {
    let mut mask = vec![0u8; window.len()];
    if window.is_empty() {
        return mask;
    }

    for polygon in &geometry.0 {
        burn_polygon(polygon, transform, window, &mut mask);
    }
    mask
}

/// Full-grid binary mask of `geometry`, 1 inside and 0 outside.
pub fn rasterize_mask(
    geometry: &MultiPolygon<f64>,
    transform: &GeoTransform,
    width: usize,
    height: usize,
) -> Vec<u8> {
    rasterize_window(geometry, transform, PixelWindow::full(width, height))
}

fn burn_polygon(polygon: &Polygon<f64>, transform: &GeoTransform, window: PixelWindow, mask: &mut [u8]) {
    let Some(rect) = polygon.bounding_rect() else {
        return;
    };
    let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    let rows = PixelWindow::covering(transform, &bbox);
    let r0 = rows.row_off.max(window.row_off);
    let r1 = (rows.row_off + rows.height as i64).min(window.row_off + window.height as i64);

    let rings: Vec<&geo::LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .collect();

    let mut crossings: Vec<f64> = Vec::new();
    for row in r0..r1 {
        let (_, y) = transform.pixel_to_world(0.0, row as f64 + 0.5);

        crossings.clear();
        for ring in &rings {
            for line in ring.lines() {
                let (a, b) = (line.start, line.end);
                // Half-open rule so a vertex on the scanline counts once
                if (a.y > y) != (b.y > y) {
                    let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                    crossings.push(x);
                }
            }
        }
        if crossings.len() < 2 {
            continue;
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        let mask_row = (row - window.row_off) as usize;
        for pair in crossings.chunks_exact(2) {
            let (ca, _) = transform.world_to_pixel(pair[0], y);
            let (cb, _) = transform.world_to_pixel(pair[1], y);
            let (lo, hi) = (ca.min(cb), ca.max(cb));
            // Cell c is inside when lo <= c + 0.5 < hi
            let first = (lo - 0.5).ceil() as i64;
            let last = (hi - 0.5).ceil() as i64 - 1;

            let c0 = first.max(window.col_off);
            let c1 = last.min(window.col_off + window.width as i64 - 1);
            for col in c0..=c1 {
                mask[mask_row * window.width + (col - window.col_off) as usize] = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn unit_grid() -> GeoTransform {
        // 10 x 10 cells of 1.0 with the top-left corner at (0, 10)
        GeoTransform::north_up(0.0, 10.0, 1.0, 1.0)
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]
    }

    #[test]
    fn test_rectangle_on_grid_lines() {
        let geom = MultiPolygon(vec![rect(2.0, 3.0, 5.0, 7.0)]);
        let mask = rasterize_mask(&geom, &unit_grid(), 10, 10);
        assert_eq!(mask.iter().filter(|v| **v == 1).count(), 12);
        // Row 3 spans y 6..7, columns 2..=4
        assert_eq!(&mask[30..40], &[0, 0, 1, 1, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_centre_rule() {
        // Covers less than half of the cells on its edges
        let geom = MultiPolygon(vec![rect(2.6, 2.6, 4.4, 4.4)]);
        let mask = rasterize_mask(&geom, &unit_grid(), 10, 10);
        // Only cell centre (3.5, 3.5) is inside
        assert_eq!(mask.iter().filter(|v| **v == 1).count(), 1);
        assert_eq!(mask[6 * 10 + 3], 1);
    }

    #[test]
    fn test_hole_is_excluded() {
        let outer = rect(0.0, 0.0, 6.0, 6.0);
        let hole = rect(2.0, 2.0, 4.0, 4.0);
        let geom = MultiPolygon(vec![Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()])]);
        let mask = rasterize_mask(&geom, &unit_grid(), 10, 10);
        assert_eq!(mask.iter().filter(|v| **v == 1).count(), 36 - 4);
    }

    #[test]
    fn test_overlapping_parts_are_ored() {
        let geom = MultiPolygon(vec![rect(0.0, 0.0, 4.0, 4.0), rect(2.0, 2.0, 6.0, 6.0)]);
        let mask = rasterize_mask(&geom, &unit_grid(), 10, 10);
        assert_eq!(mask.iter().filter(|v| **v == 1).count(), 16 + 16 - 4);
    }

    #[test]
    fn test_window_offsets() {
        let geom = MultiPolygon(vec![rect(2.0, 3.0, 5.0, 7.0)]);
        let window = PixelWindow {
            col_off: 3,
            row_off: 4,
            width: 4,
            height: 4,
        };
        let mask = rasterize_window(&geom, &unit_grid(), window);
        // Rows 4..=6 and cols 3..=4 of the full grid fall inside
        assert_eq!(mask.iter().filter(|v| **v == 1).count(), 6);
        assert_eq!(&mask[0..4], &[1, 1, 0, 0]);
        assert_eq!(&mask[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_covering_window_snaps_outward() {
        let t = unit_grid();
        let w = PixelWindow::covering(&t, &BoundingBox::new(2.5, 3.2, 5.0, 7.9));
        assert_eq!(w, PixelWindow { col_off: 2, row_off: 2, width: 3, height: 5 });

        let clipped = PixelWindow::covering(&t, &BoundingBox::new(-3.0, 8.0, 2.0, 12.0)).clip(10, 10);
        assert_eq!(clipped, PixelWindow { col_off: 0, row_off: 0, width: 2, height: 2 });
    }
}
