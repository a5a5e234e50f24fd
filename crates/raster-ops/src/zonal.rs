//! Per-polygon summary statistics of raster cells.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use geo::BoundingRect;
use precip_common::{BoundingBox, PolygonZoneSet, RasterGrid, Zone};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RasterOpsError, Result};
use crate::export::write_statistics_csv;
use crate::rasterize::{rasterize_window, PixelWindow};
use crate::reproject::zones_to_crs;

/// A supported zonal statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Count,
    Min,
    Max,
    Mean,
    Sum,
    /// Population standard deviation.
    Std,
    Median,
    /// Most frequent value, smallest on ties.
    Majority,
    /// Least frequent value, smallest on ties.
    Minority,
    /// Number of distinct values.
    Unique,
    Range,
    /// Cells equal to the declared no-data value.
    Nodata,
    /// Cells holding NaN.
    Nan,
}

impl Statistic {
    pub const ALL: [Statistic; 13] = [
        Statistic::Count,
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Sum,
        Statistic::Std,
        Statistic::Median,
        Statistic::Majority,
        Statistic::Minority,
        Statistic::Unique,
        Statistic::Range,
        Statistic::Nodata,
        Statistic::Nan,
    ];

    /// Statistics used when none are requested.
    pub const DEFAULT: [Statistic; 4] = [Statistic::Count, Statistic::Min, Statistic::Max, Statistic::Mean];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Std => "std",
            Self::Median => "median",
            Self::Majority => "majority",
            Self::Minority => "minority",
            Self::Unique => "unique",
            Self::Range => "range",
            Self::Nodata => "nodata",
            Self::Nan => "nan",
        }
    }
}

impl FromStr for Statistic {
    type Err = RasterOpsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Statistic::ALL
            .iter()
            .copied()
            .find(|stat| stat.as_str() == s)
            .ok_or_else(|| RasterOpsError::UnknownStatistic(s.to_string()))
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a space-delimited statistics list, keeping request order.
///
/// Repeated names are kept once. A blank list yields [`Statistic::DEFAULT`].
pub fn parse_statistics(list: &str) -> Result<Vec<Statistic>> {
    let mut stats = Vec::new();
    for token in list.split_whitespace() {
        let stat: Statistic = token.parse()?;
        if !stats.contains(&stat) {
            stats.push(stat);
        }
    }
    if stats.is_empty() {
        stats.extend_from_slice(&Statistic::DEFAULT);
    }
    Ok(stats)
}

/// Requested statistics of one zone, `None` where undefined.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ZoneStatistics {
    values: BTreeMap<Statistic, Option<f64>>,
}

impl ZoneStatistics {
    /// Value of `stat`; `None` when it was not requested or is undefined.
    pub fn get(&self, stat: Statistic) -> Option<f64> {
        self.values.get(&stat).copied().flatten()
    }

    pub fn contains(&self, stat: Statistic) -> bool {
        self.values.contains_key(&stat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Statistic, Option<f64>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// One output row: a zone and its statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRow {
    pub id: String,
    pub attributes: Vec<String>,
    pub statistics: ZoneStatistics,
}

/// Statistics of every zone of a set, in zone order.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalStatisticsResult {
    zone_set: String,
    columns: Vec<String>,
    statistics: Vec<Statistic>,
    rows: Vec<ZoneRow>,
}

impl ZonalStatisticsResult {
    pub fn zone_set(&self) -> &str {
        &self.zone_set
    }

    /// Attribute column names, in `.dbf` order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Statistics in request order.
    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    pub fn rows(&self) -> &[ZoneRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, zone_id: &str) -> Option<&ZoneStatistics> {
        self.rows.iter().find(|r| r.id == zone_id).map(|r| &r.statistics)
    }
}

/// Cells of one zone split by kind.
#[derive(Debug, Default)]
struct ZoneSample {
    values: Vec<f64>,
    nodata: usize,
    nan: usize,
}

/// Compute `requested` statistics of `raster` for every zone of `zones`.
///
/// A cell belongs to a zone when its centre lies inside the zone polygon.
/// NaN and no-data cells are left out of every value statistic and counted
/// by `nan` and `nodata`. When `output_table` is given the result is also
/// written there as CSV.
pub fn compute_zonal_statistics(
    raster: &RasterGrid,
    zones: &PolygonZoneSet,
    requested: &[Statistic],
    output_table: Option<&Path>,
) -> Result<ZonalStatisticsResult> {
    if zones.polygon_count() == 0 {
        return Err(RasterOpsError::EmptyZoneSet(zones.name().to_string()));
    }
    raster.ensure_axis_aligned()?;

    let statistics = if requested.is_empty() {
        Statistic::DEFAULT.to_vec()
    } else {
        requested.to_vec()
    };

    let zones = zones_to_crs(zones, raster.crs())?;

    let rows: Vec<ZoneRow> = zones
        .zones()
        .par_iter()
        .map(|zone| {
            let sample = sample_zone(raster, zone);
            ZoneRow {
                id: zone.id.clone(),
                attributes: zone.attributes.clone(),
                statistics: summarize(&sample, &statistics),
            }
        })
        .collect();

    debug!(zone_set = zones.name(), zones = rows.len(), "zonal statistics computed");

    let result = ZonalStatisticsResult {
        zone_set: zones.name().to_string(),
        columns: zones.columns().to_vec(),
        statistics,
        rows,
    };

    if let Some(path) = output_table {
        write_statistics_csv(path, &result).map_err(|e| RasterOpsError::io_write(path, e))?;
        info!(zone_set = result.zone_set(), path = %path.display(), "statistics table written");
    }

    Ok(result)
}

fn sample_zone(raster: &RasterGrid, zone: &Zone) -> ZoneSample {
    let mut sample = ZoneSample::default();
    let Some(rect) = zone.geometry.bounding_rect() else {
        return sample;
    };
    let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    if !bbox.intersects(&raster.bounds()) {
        return sample;
    }

    let transform = raster.transform();
    let window = PixelWindow::covering(transform, &bbox).clip(raster.width(), raster.height());
    if window.is_empty() {
        return sample;
    }

    let mask = rasterize_window(&zone.geometry, transform, window);
    for (i, inside) in mask.iter().enumerate() {
        if *inside == 0 {
            continue;
        }
        let col = window.col_off as usize + i % window.width;
        let row = window.row_off as usize + i / window.width;
        let v = raster.data()[row * raster.width() + col];
        if v.is_nan() {
            sample.nan += 1;
        } else if raster.is_no_data(v) {
            sample.nodata += 1;
        } else {
            sample.values.push(v as f64);
        }
    }
    sample
}

fn summarize(sample: &ZoneSample, requested: &[Statistic]) -> ZoneStatistics {
    let values = &sample.values;
    let n = values.len();

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    // (value, occurrences) in ascending value order
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for v in &sorted {
        match counts.last_mut() {
            Some((last, c)) if *last == *v => *c += 1,
            _ => counts.push((*v, 1)),
        }
    }

    let sum: f64 = values.iter().sum();
    let mean = (n > 0).then(|| sum / n as f64);
    let min = sorted.first().copied();
    let max = sorted.last().copied();

    let mut out = ZoneStatistics::default();
    for stat in requested {
        let value = match stat {
            Statistic::Count => Some(n as f64),
            Statistic::Min => min,
            Statistic::Max => max,
            Statistic::Mean => mean,
            Statistic::Sum => (n > 0).then_some(sum),
            Statistic::Std => mean.map(|m| {
                let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
                var.sqrt()
            }),
            Statistic::Median => median(&sorted),
            // Strict comparisons over ascending values keep the smallest on ties
            Statistic::Majority => counts
                .iter()
                .fold(None, |best: Option<(f64, usize)>, &(v, c)| match best {
                    Some((_, bc)) if bc >= c => best,
                    _ => Some((v, c)),
                })
                .map(|(v, _)| v),
            Statistic::Minority => counts
                .iter()
                .fold(None, |best: Option<(f64, usize)>, &(v, c)| match best {
                    Some((_, bc)) if bc <= c => best,
                    _ => Some((v, c)),
                })
                .map(|(v, _)| v),
            Statistic::Unique => Some(counts.len() as f64),
            Statistic::Range => min.zip(max).map(|(lo, hi)| hi - lo),
            Statistic::Nodata => Some(sample.nodata as f64),
            Statistic::Nan => Some(sample.nan as f64),
        };
        out.values.insert(*stat, value);
    }
    out
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}
