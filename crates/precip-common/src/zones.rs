//! Polygon zone sets and region boundaries.

use std::collections::HashSet;

use geo::{BoundingRect, MultiPolygon};
use thiserror::Error;

use crate::{BoundingBox, CrsCode};

/// One zone of a partition: its identifier, non-geometric attributes and
/// geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: String,
    /// Attribute values in the same order as [`PolygonZoneSet::columns`]
    pub attributes: Vec<String>,
    pub geometry: MultiPolygon<f64>,
}

impl Zone {
    /// Number of polygons making up the zone.
    pub fn polygon_count(&self) -> usize {
        self.geometry.0.len()
    }
}

/// An ordered set of zones sharing one CRS and one attribute schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonZoneSet {
    name: String,
    id_field: String,
    columns: Vec<String>,
    zones: Vec<Zone>,
    crs: CrsCode,
}

impl PolygonZoneSet {
    /// Build a zone set, rejecting duplicate ids and rows whose attribute
    /// count does not match the column list.
    pub fn new(
        name: impl Into<String>,
        id_field: impl Into<String>,
        columns: Vec<String>,
        zones: Vec<Zone>,
        crs: CrsCode,
    ) -> Result<Self, ZoneSetError> {
        let mut seen = HashSet::with_capacity(zones.len());
        for zone in &zones {
            if !seen.insert(zone.id.as_str()) {
                return Err(ZoneSetError::DuplicateZoneId(zone.id.clone()));
            }
            if zone.attributes.len() != columns.len() {
                return Err(ZoneSetError::AttributeMismatch {
                    zone: zone.id.clone(),
                    expected: columns.len(),
                    actual: zone.attributes.len(),
                });
            }
        }

        Ok(Self {
            name: name.into(),
            id_field: id_field.into(),
            columns,
            zones,
            crs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Attribute column names (geometry excluded).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Total number of polygons across all zones.
    pub fn polygon_count(&self) -> usize {
        self.zones.iter().map(Zone::polygon_count).sum()
    }

    /// Same set with every geometry replaced by `f(geometry)`.
    pub fn try_map_geometries<E, F>(&self, crs: CrsCode, mut f: F) -> Result<Self, E>
    where
        F: FnMut(&MultiPolygon<f64>) -> Result<MultiPolygon<f64>, E>,
    {
        let zones = self
            .zones
            .iter()
            .map(|zone| {
                Ok(Zone {
                    id: zone.id.clone(),
                    attributes: zone.attributes.clone(),
                    geometry: f(&zone.geometry)?,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;

        Ok(Self {
            name: self.name.clone(),
            id_field: self.id_field.clone(),
            columns: self.columns.clone(),
            zones,
            crs,
        })
    }
}

/// A region-of-interest outline used as a cutline.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub geometry: MultiPolygon<f64>,
    pub crs: CrsCode,
}

impl Boundary {
    pub fn new(geometry: MultiPolygon<f64>, crs: CrsCode) -> Self {
        Self { geometry, crs }
    }

    /// Extent of the outline, `None` when it holds no polygon.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let rect = self.geometry.bounding_rect()?;
        Some(BoundingBox::new(
            rect.min().x,
            rect.min().y,
            rect.max().x,
            rect.max().y,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ZoneSetError {
    #[error("duplicate zone id '{0}'")]
    DuplicateZoneId(String),

    #[error("zone '{zone}' has {actual} attributes, expected {expected}")]
    AttributeMismatch {
        zone: String,
        expected: usize,
        actual: usize,
    },
}
