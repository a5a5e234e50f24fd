//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::PI;

use crate::ProjectionError;

/// Web Mercator projection on the WGS84 semi-major axis sphere.
#[derive(Debug, Clone, Copy)]
pub struct WebMercator {
    /// Sphere radius (meters)
    pub radius: f64,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            radius: 6_378_137.0,
        }
    }
}

impl WebMercator {
    /// Latitude beyond which the projection is clipped (degrees).
    pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

    /// Convert lon/lat degrees to projected meters.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        if lat.abs() > Self::MAX_LATITUDE {
            return Err(ProjectionError::OutOfDomain {
                projection: "EPSG:3857".to_string(),
                x: lon,
                y: lat,
            });
        }
        let x = self.radius * lon.to_radians();
        let y = self.radius * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        Ok((x, y))
    }

    /// Convert projected meters to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / self.radius).to_degrees();
        let lat = (2.0 * (y / self.radius).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        let proj = WebMercator::default();
        let (x, y) = proj.forward(0.0, 0.0).unwrap();
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_world_extent() {
        let proj = WebMercator::default();
        let max_extent = 20_037_508.342_789_244;
        let (x, y) = proj.forward(180.0, WebMercator::MAX_LATITUDE).unwrap();
        assert!((x - max_extent).abs() < 1e-6, "x = {}", x);
        assert!((y - max_extent).abs() < 1.0, "y = {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let proj = WebMercator::default();
        let (x, y) = proj.forward(-50.25, -21.75).unwrap();
        let (lon, lat) = proj.inverse(x, y);
        assert!((lon + 50.25).abs() < 1e-9);
        assert!((lat + 21.75).abs() < 1e-9);
    }

    #[test]
    fn test_polar_latitude_rejected() {
        assert!(WebMercator::default().forward(0.0, 89.0).is_err());
    }
}
