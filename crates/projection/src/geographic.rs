//! Geographic datum handling.
//!
//! WGS84 and SIRGAS 2000 agree to well under a meter across Brazil and are
//! treated as the same datum. SAD69 is shifted with the abridged Molodensky
//! transformation using the EPSG:1864 parameters.

use crate::Ellipsoid;

/// Geodetic datum of a geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeographicDatum {
    Wgs84,
    Sirgas2000,
    Sad69,
}

impl GeographicDatum {
    pub fn ellipsoid(&self) -> Ellipsoid {
        match self {
            GeographicDatum::Wgs84 => Ellipsoid::WGS84,
            GeographicDatum::Sirgas2000 => Ellipsoid::GRS80,
            GeographicDatum::Sad69 => Ellipsoid::GRS67_SAD69,
        }
    }
}

/// SAD69 → WGS84 geocentric translation (meters), EPSG:1864.
const SAD69_SHIFT: (f64, f64, f64) = (-57.0, 1.0, -41.0);

/// Convert lon/lat degrees on `from` to lon/lat degrees on `to`.
pub fn convert_datum(lon: f64, lat: f64, from: GeographicDatum, to: GeographicDatum) -> (f64, f64) {
    use GeographicDatum::*;

    match (from, to) {
        (Sad69, Sad69) => (lon, lat),
        (Sad69, _) => molodensky(lon, lat, Ellipsoid::GRS67_SAD69, Ellipsoid::WGS84, SAD69_SHIFT),
        (_, Sad69) => {
            let (dx, dy, dz) = SAD69_SHIFT;
            molodensky(lon, lat, Ellipsoid::WGS84, Ellipsoid::GRS67_SAD69, (-dx, -dy, -dz))
        }
        _ => (lon, lat),
    }
}

/// Abridged Molodensky transformation.
fn molodensky(
    lon: f64,
    lat: f64,
    source: Ellipsoid,
    target: Ellipsoid,
    (dx, dy, dz): (f64, f64, f64),
) -> (f64, f64) {
    let phi = lat.to_radians();
    let lam = lon.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_lam, cos_lam) = lam.sin_cos();

    let da = target.a - source.a;
    let df = target.f - source.f;
    let e2 = source.e2();
    let w = (1.0 - e2 * sin_phi * sin_phi).sqrt();
    // Radii of curvature in the meridian and prime vertical
    let m = source.a * (1.0 - e2) / (w * w * w);
    let n = source.a / w;

    let d_phi = (-dx * sin_phi * cos_lam - dy * sin_phi * sin_lam
        + dz * cos_phi
        + (source.a * df + source.f * da) * (2.0 * phi).sin())
        / m;
    let d_lam = (-dx * sin_lam + dy * cos_lam) / (n * cos_phi);

    (lon + d_lam.to_degrees(), lat + d_phi.to_degrees())
}
