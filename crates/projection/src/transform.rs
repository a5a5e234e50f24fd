//! Point transformation between two CRSs.

use precip_common::crs::Datum;
use precip_common::CrsCode;

use crate::geographic::{convert_datum, GeographicDatum};
use crate::{Ellipsoid, ProjectionError, TransverseMercator, WebMercator};

/// How a CRS relates to geographic lon/lat.
#[derive(Debug, Clone, Copy)]
enum Leg {
    Geographic(GeographicDatum),
    WebMercator(WebMercator),
    Utm(TransverseMercator, GeographicDatum),
}

impl Leg {
    fn for_crs(crs: CrsCode) -> Self {
        match crs {
            CrsCode::Epsg4326 => Leg::Geographic(GeographicDatum::Wgs84),
            CrsCode::Epsg4674 => Leg::Geographic(GeographicDatum::Sirgas2000),
            CrsCode::Epsg4618 => Leg::Geographic(GeographicDatum::Sad69),
            CrsCode::Epsg3857 => Leg::WebMercator(WebMercator::default()),
            CrsCode::Utm { zone, south, datum } => {
                let (ellipsoid, geo_datum) = match datum {
                    Datum::Wgs84 => (Ellipsoid::WGS84, GeographicDatum::Wgs84),
                    Datum::Sirgas2000 => (Ellipsoid::GRS80, GeographicDatum::Sirgas2000),
                };
                Leg::Utm(TransverseMercator::utm(zone, south, ellipsoid), geo_datum)
            }
        }
    }

    fn datum(&self) -> GeographicDatum {
        match self {
            Leg::Geographic(d) => *d,
            Leg::WebMercator(_) => GeographicDatum::Wgs84,
            Leg::Utm(_, d) => *d,
        }
    }

    fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Leg::Geographic(_) => (x, y),
            Leg::WebMercator(p) => p.inverse(x, y),
            Leg::Utm(p, _) => p.inverse(x, y),
        }
    }

    fn from_lonlat(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        match self {
            Leg::Geographic(_) => Ok((lon, lat)),
            Leg::WebMercator(p) => p.forward(lon, lat),
            Leg::Utm(p, _) => p.forward(lon, lat),
        }
    }
}

/// Transforms coordinates from a source CRS to a target CRS.
///
/// Projected coordinates are taken to lon/lat on their datum, shifted to
/// the target datum if needed, then projected again.
#[derive(Debug, Clone, Copy)]
pub struct CrsTransform {
    source: CrsCode,
    target: CrsCode,
    from: Leg,
    to: Leg,
}

impl CrsTransform {
    pub fn new(source: CrsCode, target: CrsCode) -> Self {
        Self {
            source,
            target,
            from: Leg::for_crs(source),
            to: Leg::for_crs(target),
        }
    }

    pub fn source(&self) -> CrsCode {
        self.source
    }

    pub fn target(&self) -> CrsCode {
        self.target
    }

    /// True when source and target are the same CRS.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transform a single coordinate pair (x = easting/longitude).
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }
        if self.is_identity() {
            return Ok((x, y));
        }

        let (lon, lat) = self.from.to_lonlat(x, y);
        let (lon, lat) = convert_datum(lon, lat, self.from.datum(), self.to.datum());
        self.to.from_lonlat(lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM_23S_SIRGAS: CrsCode = CrsCode::Utm {
        zone: 23,
        south: true,
        datum: Datum::Sirgas2000,
    };

    #[test]
    fn test_identity() {
        let t = CrsTransform::new(CrsCode::Epsg4674, CrsCode::Epsg4674);
        assert!(t.is_identity());
        assert_eq!(t.transform(-46.6, -23.5).unwrap(), (-46.6, -23.5));
    }

    #[test]
    fn test_sirgas_geographic_to_wgs84_is_numeric_identity() {
        let t = CrsTransform::new(CrsCode::Epsg4674, CrsCode::Epsg4326);
        assert!(!t.is_identity());
        assert_eq!(t.transform(-46.6, -23.5).unwrap(), (-46.6, -23.5));
    }

    #[test]
    fn test_utm_to_geographic_roundtrip() {
        let to_utm = CrsTransform::new(CrsCode::Epsg4326, UTM_23S_SIRGAS);
        let to_geo = CrsTransform::new(UTM_23S_SIRGAS, CrsCode::Epsg4326);

        let (e, n) = to_utm.transform(-46.63, -23.55).unwrap();
        assert!(e > 300_000.0 && e < 700_000.0);
        assert!(n > 7_000_000.0 && n < 7_500_000.0);

        let (lon, lat) = to_geo.transform(e, n).unwrap();
        assert!((lon + 46.63).abs() < 1e-7);
        assert!((lat + 23.55).abs() < 1e-7);
    }

    #[test]
    fn test_web_mercator_to_utm() {
        let merc = CrsTransform::new(CrsCode::Epsg4326, CrsCode::Epsg3857);
        let (x, y) = merc.transform(-45.0, -22.0).unwrap();

        let t = CrsTransform::new(CrsCode::Epsg3857, UTM_23S_SIRGAS);
        let (e, _n) = t.transform(x, y).unwrap();
        // -45° is the central meridian of zone 23
        assert!((e - 500_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_finite_rejected() {
        let t = CrsTransform::new(CrsCode::Epsg4326, CrsCode::Epsg3857);
        assert!(matches!(
            t.transform(f64::NAN, 0.0),
            Err(ProjectionError::NonFinite { .. })
        ));
    }
}
