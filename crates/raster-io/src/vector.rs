//! ESRI shapefile loading for boundaries and zone sets.
//!
//! Geometry comes from the `.shp`, attributes from the `.dbf` (column order
//! is taken from the table header), and the CRS from the `.prj` sidecar when
//! present.

use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use precip_common::{Boundary, CrsCode, PolygonZoneSet, Zone};
use shapefile::dbase::{self, FieldValue};
use shapefile::{PolygonRing, Reader, Shape};
use tracing::{debug, info, warn};

use crate::error::{RasterIoError, Result};

/// Pseudo-column some dBase readers expose for the deletion marker.
const DELETION_FLAG: &str = "DeletionFlag";

/// Load every polygon record of a shapefile as a zone keyed by `id_field`.
pub fn load_zone_set(
    path: &Path,
    name: &str,
    id_field: &str,
    default_crs: CrsCode,
) -> Result<PolygonZoneSet> {
    ensure_exists(path)?;
    let columns = read_columns(path)?;
    if !columns.iter().any(|c| c == id_field) {
        return Err(RasterIoError::MissingField {
            path: path.to_path_buf(),
            field: id_field.to_string(),
        });
    }

    let crs = read_prj(path, default_crs)?;
    let mut reader =
        Reader::from_path(path).map_err(|e| RasterIoError::shapefile(path, e.to_string()))?;
    let mut zones = Vec::new();
    let mut skipped = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|e| RasterIoError::shapefile(path, e.to_string()))?;
        let Some(geometry) = shape_to_multipolygon(shape) else {
            skipped += 1;
            continue;
        };

        let attributes: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).map(format_field).unwrap_or_default())
            .collect();
        let id = record.get(id_field).map(format_field).unwrap_or_default();

        zones.push(Zone {
            id,
            attributes,
            geometry,
        });
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "ignored non-polygon shapes");
    }

    let set = PolygonZoneSet::new(name, id_field, columns, zones, crs)?;
    info!(
        zone_set = name,
        path = %path.display(),
        zones = set.len(),
        polygons = set.polygon_count(),
        crs = %crs,
        "loaded zone set"
    );
    Ok(set)
}

/// Load the union of all polygon shapes of a shapefile as one outline.
///
/// An empty outline is returned when the file has no polygon; callers
/// decide whether that is an error.
pub fn load_boundary(path: &Path, default_crs: CrsCode) -> Result<Boundary> {
    ensure_exists(path)?;
    let crs = read_prj(path, default_crs)?;
    let mut reader =
        Reader::from_path(path).map_err(|e| RasterIoError::shapefile(path, e.to_string()))?;
    let mut polygons = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, _record) = result.map_err(|e| RasterIoError::shapefile(path, e.to_string()))?;
        if let Some(MultiPolygon(parts)) = shape_to_multipolygon(shape) {
            polygons.extend(parts);
        }
    }

    debug!(path = %path.display(), polygons = polygons.len(), crs = %crs, "loaded boundary");
    Ok(Boundary::new(MultiPolygon(polygons), crs))
}

/// CRS declared by the `.prj` next to `path`, or `default_crs` without one.
pub fn read_prj(path: &Path, default_crs: CrsCode) -> Result<CrsCode> {
    let prj = path.with_extension("prj");
    match std::fs::read_to_string(&prj) {
        Ok(wkt) => Ok(CrsCode::from_wkt(&wkt)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), crs = %default_crs, "no .prj sidecar, using default CRS");
            Ok(default_crs)
        }
        Err(e) => Err(RasterIoError::io(&prj, e)),
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RasterIoError::SourceNotFound(path.to_path_buf()))
    }
}

fn read_columns(path: &Path) -> Result<Vec<String>> {
    let dbf = path.with_extension("dbf");
    if !dbf.exists() {
        return Err(RasterIoError::SourceNotFound(dbf));
    }
    let table = dbase::Reader::from_path(&dbf).map_err(|e| RasterIoError::shapefile(&dbf, e.to_string()))?;
    Ok(table
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .filter(|name| name != DELETION_FLAG)
        .collect())
}

fn shape_to_multipolygon(shape: Shape) -> Option<MultiPolygon<f64>> {
    let rings: Vec<(bool, Vec<Coord<f64>>)> = match shape {
        Shape::Polygon(p) => p
            .rings()
            .iter()
            .map(|r| (is_outer(r), r.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect()))
            .collect(),
        Shape::PolygonM(p) => p
            .rings()
            .iter()
            .map(|r| (is_outer(r), r.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect()))
            .collect(),
        Shape::PolygonZ(p) => p
            .rings()
            .iter()
            .map(|r| (is_outer(r), r.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect()))
            .collect(),
        _ => return None,
    };

    // Each outer ring opens a new polygon; inner rings belong to the last one
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for (outer, coords) in rings {
        let ring = LineString::from(coords);
        if outer || polygons.is_empty() {
            polygons.push(Polygon::new(ring, vec![]));
        } else if let Some(last) = polygons.last_mut() {
            last.interiors_push(ring);
        }
    }

    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon(polygons))
    }
}

fn is_outer<P>(ring: &PolygonRing<P>) -> bool {
    matches!(ring, PolygonRing::Outer(_))
}

/// Render a dBase value the way it reads in the attribute table.
fn format_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Character(Some(s)) => s.trim().to_string(),
        FieldValue::Numeric(Some(n)) => format_number(*n),
        FieldValue::Float(Some(f)) => format_number(*f as f64),
        FieldValue::Double(d) => format_number(*d),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Logical(Some(b)) => b.to_string(),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None) => String::new(),
        other => format!("{:?}", other),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
