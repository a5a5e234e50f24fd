//! Tests for BoundingBox operations and grid extents.

use precip_common::{BoundingBox, CrsCode, GeoTransform, RasterGrid};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-53.2, -25.4, -44.1, -19.7);
    assert_eq!(bbox.min_x, -53.2);
    assert_eq!(bbox.min_y, -25.4);
    assert_eq!(bbox.max_x, -44.1);
    assert_eq!(bbox.max_y, -19.7);
}

#[test]
fn test_bbox_dimensions() {
    let bbox = BoundingBox::new(-60.0, -30.0, -40.0, -15.0);
    assert_eq!(bbox.width(), 20.0);
    assert_eq!(bbox.height(), 15.0);
}

// ============================================================================
// Intersection tests
// ============================================================================

#[test]
fn test_touching_boxes_do_not_intersect() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert!(!a.intersects(&b));
    assert!(a.intersection(&b).is_none());
}

#[test]
fn test_contained_box_intersection_is_inner_box() {
    let outer = BoundingBox::new(-60.0, -30.0, -40.0, -15.0);
    let inner = BoundingBox::new(-50.0, -25.0, -45.0, -20.0);
    assert_eq!(outer.intersection(&inner), Some(inner));
}

// ============================================================================
// Grid extent tests
// ============================================================================

#[test]
fn test_merge_grid_extent() {
    // MERGE/GPM South America grid: 0.1 degree cells
    let transform = GeoTransform::north_up(-82.05, 12.05, 0.1, 0.1);
    let grid = RasterGrid::filled(10, 10, 0.0, transform, CrsCode::Epsg4326, None).unwrap();
    let bbox = grid.bounds();
    assert!(bbox.approx_eq(&BoundingBox::new(-82.05, 11.05, -81.05, 12.05), 1e-9));
}

#[test]
fn test_south_up_transform_extent_is_normalized() {
    let transform = GeoTransform::from_gdal([0.0, 1.0, 0.0, -10.0, 0.0, 1.0]);
    let bbox = transform.bounds(4, 4);
    assert_eq!(bbox, BoundingBox::new(0.0, -10.0, 4.0, -6.0));
}
