//! Common test fixtures: boundary and zone shapefiles, CRS definitions.

use std::path::Path;

use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};

/// `.prj` contents for the CRSs the pipeline meets in practice.
pub mod prj {
    pub const SIRGAS_2000: &str = r#"GEOGCS["SIRGAS 2000",DATUM["Sistema_de_Referencia_Geocentrico_para_las_AmericaS_2000",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6674"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4674"]]"#;

    pub const WGS_84: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

    /// ESRI flavour without authority codes, as exported by desktop GIS.
    pub const SIRGAS_2000_UTM_23S_ESRI: &str = r#"PROJCS["SIRGAS_2000_UTM_Zone_23S",GEOGCS["GCS_SIRGAS_2000",DATUM["D_SIRGAS_2000",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-45.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
}

/// Axis-aligned square ring with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    rectangle(x, y, x + size, y + size)
}

/// Axis-aligned rectangle ring.
pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<(f64, f64)> {
    vec![
        (min_x, min_y),
        (min_x, max_y),
        (max_x, max_y),
        (max_x, min_y),
        (min_x, min_y),
    ]
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Numeric,
}

struct Feature {
    outers: Vec<Vec<(f64, f64)>>,
    holes: Vec<Vec<(f64, f64)>>,
    values: Vec<String>,
}

/// Builder for small polygon shapefiles with `.dbf` attributes and an
/// optional `.prj`.
///
/// ```ignore
/// ShapefileFixture::new()
///     .text_field("codigo")
///     .text_field("nome")
///     .polygon(square(-50.0, -21.0, 0.5), &["1", "Aguapei"])
///     .with_prj(prj::SIRGAS_2000)
///     .write(&dir.path().join("ugrhi.shp"))?;
/// ```
#[derive(Default)]
pub struct ShapefileFixture {
    fields: Vec<(String, FieldKind)>,
    features: Vec<Feature>,
    prj: Option<String>,
}

impl ShapefileFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_field(mut self, name: &str) -> Self {
        self.fields.push((name.to_string(), FieldKind::Text));
        self
    }

    pub fn numeric_field(mut self, name: &str) -> Self {
        self.fields.push((name.to_string(), FieldKind::Numeric));
        self
    }

    /// Single-ring polygon feature.
    pub fn polygon(self, ring: Vec<(f64, f64)>, values: &[&str]) -> Self {
        self.multi_polygon(vec![ring], values)
    }

    /// Feature made of several disjoint outer rings.
    pub fn multi_polygon(mut self, rings: Vec<Vec<(f64, f64)>>, values: &[&str]) -> Self {
        self.features.push(Feature {
            outers: rings,
            holes: Vec::new(),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    /// Polygon feature with one hole.
    pub fn polygon_with_hole(
        mut self,
        outer: Vec<(f64, f64)>,
        hole: Vec<(f64, f64)>,
        values: &[&str],
    ) -> Self {
        self.features.push(Feature {
            outers: vec![outer],
            holes: vec![hole],
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn with_prj(mut self, wkt: &str) -> Self {
        self.prj = Some(wkt.to_string());
        self
    }

    /// Write `.shp`, `.shx`, `.dbf` (and `.prj` if set) next to `path`.
    pub fn write(&self, path: &Path) -> Result<(), shapefile::Error> {
        let mut table = TableWriterBuilder::new();
        for (name, kind) in &self.fields {
            let field_name = FieldName::try_from(name.as_str())
                .map_err(|_| invalid_input(format!("bad dBase field name '{}'", name)))?;
            table = match kind {
                FieldKind::Text => table.add_character_field(field_name, 80),
                FieldKind::Numeric => table.add_numeric_field(field_name, 18, 4),
            };
        }

        let mut writer = shapefile::Writer::from_path(path, table)?;
        for feature in &self.features {
            let mut rings: Vec<PolygonRing<Point>> = feature
                .outers
                .iter()
                .map(|r| PolygonRing::Outer(points(r)))
                .collect();
            rings.extend(feature.holes.iter().map(|r| PolygonRing::Inner(points(r))));
            let polygon = Polygon::with_rings(rings);

            let mut record = dbase::Record::default();
            for ((name, kind), value) in self.fields.iter().zip(&feature.values) {
                let field = match kind {
                    FieldKind::Text => FieldValue::Character(Some(value.clone())),
                    FieldKind::Numeric => FieldValue::Numeric(value.parse().ok()),
                };
                record.insert(name.clone(), field);
            }
            writer.write_shape_and_record(&polygon, &record)?;
        }
        drop(writer);

        if let Some(wkt) = &self.prj {
            std::fs::write(path.with_extension("prj"), wkt)?;
        }
        Ok(())
    }
}

fn points(ring: &[(f64, f64)]) -> Vec<Point> {
    ring.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn invalid_input(msg: String) -> shapefile::Error {
    shapefile::Error::IoError(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))
}
