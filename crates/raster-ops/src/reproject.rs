//! Vector geometry reprojection onto a raster's CRS.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use precip_common::{Boundary, CrsCode, PolygonZoneSet};
use projection::{CrsTransform, ProjectionError};
use tracing::debug;

use crate::error::{RasterOpsError, Result};

/// Transform every vertex of `geometry`.
pub fn reproject_geometry(
    geometry: &MultiPolygon<f64>,
    transform: &CrsTransform,
) -> std::result::Result<MultiPolygon<f64>, ProjectionError> {
    if transform.is_identity() {
        return Ok(geometry.clone());
    }

    let ring = |ls: &LineString<f64>| -> std::result::Result<LineString<f64>, ProjectionError> {
        ls.0.iter()
            .map(|c| transform.transform(c.x, c.y).map(|(x, y)| Coord { x, y }))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(LineString::new)
    };

    geometry
        .0
        .iter()
        .map(|polygon| {
            let exterior = ring(polygon.exterior())?;
            let interiors = polygon
                .interiors()
                .iter()
                .map(ring)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Polygon::new(exterior, interiors))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(MultiPolygon)
}

/// Boundary expressed in `target`, cloned unchanged when already there.
pub fn boundary_to_crs(boundary: &Boundary, target: CrsCode) -> Result<Boundary> {
    if boundary.crs == target {
        return Ok(boundary.clone());
    }
    debug!(from = %boundary.crs, to = %target, "reprojecting boundary");

    let transform = CrsTransform::new(boundary.crs, target);
    let geometry = reproject_geometry(&boundary.geometry, &transform)
        .map_err(|e| RasterOpsError::crs_reconciliation(boundary.crs, target, e))?;
    Ok(Boundary::new(geometry, target))
}

/// Zone set expressed in `target`, cloned unchanged when already there.
pub fn zones_to_crs(zones: &PolygonZoneSet, target: CrsCode) -> Result<PolygonZoneSet> {
    if zones.crs() == target {
        return Ok(zones.clone());
    }
    debug!(zone_set = zones.name(), from = %zones.crs(), to = %target, "reprojecting zones");

    let transform = CrsTransform::new(zones.crs(), target);
    zones.try_map_geometries(target, |geometry| {
        reproject_geometry(geometry, &transform)
            .map_err(|e| RasterOpsError::crs_reconciliation(zones.crs(), target, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use precip_common::crs::Datum;

    #[test]
    fn test_same_crs_is_unchanged() {
        let geom = MultiPolygon(vec![polygon![(x: -48.0, y: -22.0), (x: -47.0, y: -22.0), (x: -47.0, y: -21.0)]]);
        let boundary = Boundary::new(geom.clone(), CrsCode::Epsg4674);
        let out = boundary_to_crs(&boundary, CrsCode::Epsg4674).unwrap();
        assert_eq!(out.geometry, geom);
    }

    #[test]
    fn test_utm_boundary_to_geographic() {
        let utm = CrsCode::Utm {
            zone: 23,
            south: true,
            datum: Datum::Sirgas2000,
        };
        // Around the central meridian (-45) of zone 23
        let geom = MultiPolygon(vec![polygon![
            (x: 400_000.0, y: 7_500_000.0),
            (x: 600_000.0, y: 7_500_000.0),
            (x: 600_000.0, y: 7_600_000.0),
            (x: 400_000.0, y: 7_600_000.0),
        ]]);
        let out = boundary_to_crs(&Boundary::new(geom, utm), CrsCode::Epsg4674).unwrap();
        assert_eq!(out.crs, CrsCode::Epsg4674);

        let bbox = out.bounds().unwrap();
        assert!(bbox.min_x > -46.5 && bbox.max_x < -43.5, "{:?}", bbox);
        assert!(bbox.min_y > -23.5 && bbox.max_y < -21.5, "{:?}", bbox);
    }

    #[test]
    fn test_non_finite_vertex_fails() {
        let geom = MultiPolygon(vec![polygon![(x: f64::NAN, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        let err = boundary_to_crs(&Boundary::new(geom, CrsCode::Epsg3857), CrsCode::Epsg4326).unwrap_err();
        assert!(matches!(err, RasterOpsError::CrsReconciliation { .. }));
    }
}
