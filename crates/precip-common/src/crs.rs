//! Coordinate Reference System identifiers.
//!
//! Only the reference systems that show up around the hourly precipitation
//! feed are modelled: the geographic systems used by the feed and by the
//! Brazilian boundary layers, Web Mercator, and UTM zones on WGS84 or
//! SIRGAS 2000. Transformations between them live in the `projection` crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geodetic datum of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datum {
    Wgs84,
    Sirgas2000,
}

/// Well-known CRS codes supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// SIRGAS 2000 Geographic
    Epsg4674,
    /// SAD69 Geographic
    Epsg4618,
    /// Web Mercator (meters)
    Epsg3857,
    /// Universal Transverse Mercator zone (meters)
    Utm { zone: u8, south: bool, datum: Datum },
}

impl CrsCode {
    /// Build a CRS from its EPSG numeric code.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        let crs = match code {
            4326 => CrsCode::Epsg4326,
            4674 => CrsCode::Epsg4674,
            4618 => CrsCode::Epsg4618,
            3857 | 900913 => CrsCode::Epsg3857,
            32601..=32660 => CrsCode::Utm {
                zone: (code - 32600) as u8,
                south: false,
                datum: Datum::Wgs84,
            },
            32701..=32760 => CrsCode::Utm {
                zone: (code - 32700) as u8,
                south: true,
                datum: Datum::Wgs84,
            },
            // SIRGAS 2000 / UTM zones 17S..25S
            31977..=31985 => CrsCode::Utm {
                zone: (code - 31977 + 17) as u8,
                south: true,
                datum: Datum::Sirgas2000,
            },
            // SIRGAS 2000 / UTM zones 17N..22N
            31972..=31976 => CrsCode::Utm {
                zone: (code - 31972 + 17) as u8,
                south: false,
                datum: Datum::Sirgas2000,
            },
            _ => return Err(CrsParseError::UnsupportedEpsg(code)),
        };
        Ok(crs)
    }

    /// EPSG numeric code for this CRS.
    pub fn epsg(&self) -> u32 {
        match *self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg4674 => 4674,
            CrsCode::Epsg4618 => 4618,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Utm {
                zone,
                south,
                datum: Datum::Wgs84,
            } => {
                if south {
                    32700 + zone as u32
                } else {
                    32600 + zone as u32
                }
            }
            CrsCode::Utm {
                zone,
                south,
                datum: Datum::Sirgas2000,
            } => {
                if south {
                    31977 + zone as u32 - 17
                } else {
                    31972 + zone as u32 - 17
                }
            }
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(
            self,
            CrsCode::Epsg4326 | CrsCode::Epsg4674 | CrsCode::Epsg4618
        )
    }

    /// Detect the CRS described by an OGC/ESRI WKT string (`.prj` contents).
    ///
    /// The outermost `AUTHORITY["EPSG", ...]` wins when present. ESRI flavoured
    /// WKT carries no authority, so the datum and projection names are used.
    pub fn from_wkt(wkt: &str) -> Result<Self, CrsParseError> {
        if let Some(code) = outer_epsg_authority(wkt) {
            return Self::from_epsg(code);
        }

        let upper = wkt.to_uppercase().replace([' ', '-'], "_");
        let trimmed = upper.trim_start();

        if trimmed.starts_with("PROJCS") {
            if upper.contains("WEB_MERCATOR") || upper.contains("PSEUDO_MERCATOR") {
                return Ok(CrsCode::Epsg3857);
            }
            if let Some((zone, south)) = utm_zone_from_name(&upper) {
                let datum = if upper.contains("SIRGAS") {
                    Datum::Sirgas2000
                } else if upper.contains("WGS_1984") || upper.contains("WGS_84") || upper.contains("WGS84") {
                    Datum::Wgs84
                } else {
                    return Err(CrsParseError::UnrecognizedWkt(first_name(wkt)));
                };
                return Ok(CrsCode::Utm { zone, south, datum });
            }
            return Err(CrsParseError::UnrecognizedWkt(first_name(wkt)));
        }

        if trimmed.starts_with("GEOGCS") {
            if upper.contains("SIRGAS") {
                return Ok(CrsCode::Epsg4674);
            }
            if upper.contains("SAD_1969") || upper.contains("SAD69") || upper.contains("SOUTH_AMERICAN_1969") {
                return Ok(CrsCode::Epsg4618);
            }
            if upper.contains("WGS_1984") || upper.contains("WGS_84") || upper.contains("WGS84") {
                return Ok(CrsCode::Epsg4326);
            }
        }

        Err(CrsParseError::UnrecognizedWkt(first_name(wkt)))
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for CrsCode {
    type Err = CrsParseError;

    /// Accepts "EPSG:31983", "epsg:4674" or a bare code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        let digits = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);
        let code = digits
            .parse::<u32>()
            .map_err(|_| CrsParseError::InvalidFormat(s.to_string()))?;
        Self::from_epsg(code)
    }
}

/// Last `AUTHORITY["EPSG","n"]` in the string, which in WKT1 belongs to the
/// outermost object.
fn outer_epsg_authority(wkt: &str) -> Option<u32> {
    let upper = wkt.to_uppercase();
    let pos = upper.rfind("AUTHORITY[\"EPSG\"")?;
    let rest = &upper[pos + "AUTHORITY[\"EPSG\"".len()..];
    let start = rest.find('"')? + 1;
    let end = start + rest[start..].find('"')?;
    rest[start..end].trim().parse().ok()
}

/// Parse "..._ZONE_23S" / "UTM ZONE 23S" style names.
fn utm_zone_from_name(upper: &str) -> Option<(u8, bool)> {
    let pos = upper.find("ZONE_")?;
    let rest = &upper[pos + 5..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let zone: u8 = digits.parse().ok()?;
    if !(1..=60).contains(&zone) {
        return None;
    }
    let hemisphere = rest[digits.len()..].chars().next()?;
    match hemisphere {
        'S' => Some((zone, true)),
        'N' => Some((zone, false)),
        _ => None,
    }
}

fn first_name(wkt: &str) -> String {
    wkt.split('"').nth(1).unwrap_or(wkt).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported EPSG code: {0}")]
    UnsupportedEpsg(u32),

    #[error("Invalid CRS format: {0}. Expected 'EPSG:<code>'")]
    InvalidFormat(String),

    #[error("Unrecognized CRS definition: {0}")]
    UnrecognizedWkt(String),
}
