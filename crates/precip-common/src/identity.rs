//! Timestamp identity of an hourly source tile.
//!
//! MERGE hourly files carry their valid time at fixed positions of the
//! filename stem, e.g. `MERGE_CPTEC_2025011513.grib2`:
//!
//! ```text
//! MERGE_CPTEC_2025011513
//!             ^   ^ ^ ^
//!            12  16 18 20
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

const YEAR: (usize, usize) = (12, 16);
const MONTH: (usize, usize) = (16, 18);
const DAY: (usize, usize) = (18, 20);
const HOUR: (usize, usize) = (20, 22);

/// Minimum stem length covering every offset window.
pub const MIN_STEM_LEN: usize = HOUR.1;

/// The (year, month, day, hour) a source tile represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIdentity {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl TileIdentity {
    /// Decode the identity from a filename or path.
    ///
    /// Only the stem (basename without the last extension) is inspected.
    pub fn decode(filename: &str) -> Result<Self, IdentityError> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if stem.len() < MIN_STEM_LEN || !stem.is_char_boundary(MIN_STEM_LEN) {
            return Err(IdentityError::MalformedFilename {
                filename: filename.to_string(),
                reason: format!(
                    "stem '{}' is shorter than the {} characters required",
                    stem, MIN_STEM_LEN
                ),
            });
        }

        let field = |(start, end): (usize, usize), name: &str| -> Result<u32, IdentityError> {
            let raw = stem.get(start..end).unwrap_or("");
            if raw.len() != end - start || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(IdentityError::MalformedFilename {
                    filename: filename.to_string(),
                    reason: format!("{} field '{}' at [{}:{}] is not numeric", name, raw, start, end),
                });
            }
            raw.parse::<u32>().map_err(|e| IdentityError::MalformedFilename {
                filename: filename.to_string(),
                reason: format!("{} field '{}': {}", name, raw, e),
            })
        };

        let year = field(YEAR, "year")?;
        let month = field(MONTH, "month")?;
        let day = field(DAY, "day")?;
        let hour = field(HOUR, "hour")?;

        if NaiveDate::from_ymd_opt(year as i32, month, day).is_none() || hour > 23 {
            return Err(IdentityError::MalformedFilename {
                filename: filename.to_string(),
                reason: format!(
                    "{:04}-{:02}-{:02} {:02}h is not a valid time",
                    year, month, day, hour
                ),
            });
        }

        Ok(Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: hour as u8,
        })
    }

    /// Destination directory name: `YYYY-MM-DD`.
    pub fn date_dir(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// Run identifier used in artifact names: `YYYY-MM-DD-HH`.
    pub fn run_id(&self) -> String {
        format!("{}-{:02}", self.date_dir(), self.hour)
    }

    /// The hour as a UTC timestamp.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .and_then(|d| d.and_hms_opt(self.hour as u32, 0, 0))
            .map(|ndt| Utc.from_utc_datetime(&ndt))
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}h", self.date_dir(), self.hour)
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("malformed tile filename '{filename}': {reason}")]
    MalformedFilename { filename: String, reason: String },
}
