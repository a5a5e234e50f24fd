//! Validated runtime settings.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use precip_common::CrsCode;
use raster_ops::{parse_statistics, InterpolationMethod, RasterOpsError, Statistic};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config_loader::{self, PipelineConfig};
use crate::error::{PipelineError, Result};

/// What to do with a tile whose outputs are already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingOutputs {
    /// Recompute and atomically replace.
    #[default]
    Overwrite,
    /// Report the tile as skipped.
    Skip,
}

impl FromStr for ExistingOutputs {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            other => Err(PipelineError::config(format!(
                "invalid existing_outputs policy '{}', expected overwrite or skip",
                other
            ))),
        }
    }
}

impl fmt::Display for ExistingOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(PipelineError::config(format!(
                "invalid log format '{}', expected json or pretty",
                other
            ))),
        }
    }
}

/// One zoning scheme to aggregate over.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSetSpec {
    pub name: String,
    pub path: PathBuf,
    pub id_field: String,
}

/// Everything the orchestrator needs, checked once at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub boundary: PathBuf,
    pub zone_sets: Vec<ZoneSetSpec>,
    pub default_crs: CrsCode,
    pub target_resolution: f64,
    pub interpolation: InterpolationMethod,
    pub statistics: Vec<Statistic>,
    pub no_data: f64,
    pub extension: String,
    pub existing_outputs: ExistingOutputs,
    pub max_parallel_tiles: usize,
    pub log_level: String,
    pub log_format: LogFormat,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl PipelineSettings {
    /// Load the YAML file, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = config_loader::load_pipeline_config(path)?;
        apply_env_overrides(&mut config);
        Self::from_config(config)
    }

    /// Validate a parsed configuration.
    ///
    /// Fails on unknown statistics or kernels, a non-positive resolution,
    /// missing zone sets and invalid logging options, before any tile is
    /// touched.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let processing = config.processing;

        let target_resolution = processing.target_resolution;
        if !target_resolution.is_finite() || target_resolution <= 0.0 {
            return Err(RasterOpsError::InvalidResolution(target_resolution).into());
        }
        let interpolation: InterpolationMethod = processing.interpolation.parse()?;
        let statistics = parse_statistics(&processing.statistics)?;
        let existing_outputs: ExistingOutputs = processing.existing_outputs.parse()?;

        if processing.max_parallel_tiles == 0 {
            return Err(PipelineError::config("max_parallel_tiles must be at least 1"));
        }
        // Zero and positive values are real rainfall
        if !processing.no_data.is_finite() || processing.no_data >= 0.0 {
            return Err(PipelineError::config(format!(
                "no_data must be a finite negative number, got {}",
                processing.no_data
            )));
        }
        let extension = processing.extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(PipelineError::config("extension cannot be empty"));
        }

        let default_crs: CrsCode = config.vectors.default_crs.parse().map_err(|e| {
            PipelineError::config(format!("default_crs '{}': {}", config.vectors.default_crs, e))
        })?;

        if config.vectors.zone_sets.is_empty() {
            return Err(PipelineError::config("at least one zone set is required"));
        }
        let mut names = HashSet::new();
        let mut zone_sets = Vec::with_capacity(config.vectors.zone_sets.len());
        for zs in config.vectors.zone_sets {
            if zs.name.trim().is_empty() || zs.id_field.trim().is_empty() {
                return Err(PipelineError::config("zone set name and id_field cannot be empty"));
            }
            if !names.insert(zs.name.clone()) {
                return Err(PipelineError::config(format!("duplicate zone set '{}'", zs.name)));
            }
            zone_sets.push(ZoneSetSpec {
                name: zs.name,
                path: PathBuf::from(zs.path),
                id_field: zs.id_field,
            });
        }

        let log_level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(PipelineError::config(format!(
                "invalid log level '{}', expected one of {:?}",
                config.logging.level, LOG_LEVELS
            )));
        }
        let log_format: LogFormat = config.logging.format.parse()?;

        Ok(Self {
            source_root: PathBuf::from(config.paths.source_root),
            output_root: PathBuf::from(config.paths.output_root),
            boundary: PathBuf::from(config.vectors.boundary),
            zone_sets,
            default_crs,
            target_resolution,
            interpolation,
            statistics,
            no_data: processing.no_data,
            extension,
            existing_outputs,
            max_parallel_tiles: processing.max_parallel_tiles,
            log_level,
            log_format,
        })
    }
}

/// Environment variables take precedence over the file.
fn apply_env_overrides(config: &mut PipelineConfig) {
    if let Ok(v) = env::var("PRECIP_SOURCE_ROOT") {
        debug!(value = %v, "PRECIP_SOURCE_ROOT override");
        config.paths.source_root = v;
    }
    if let Ok(v) = env::var("PRECIP_OUTPUT_ROOT") {
        debug!(value = %v, "PRECIP_OUTPUT_ROOT override");
        config.paths.output_root = v;
    }
    if let Ok(v) = env::var("PRECIP_EXISTING_OUTPUTS") {
        config.processing.existing_outputs = v;
    }
    if let Some(n) = env::var("PRECIP_MAX_PARALLEL_TILES")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.processing.max_parallel_tiles = n;
    }
    if let Ok(v) = env::var("PRECIP_LOG_LEVEL") {
        config.logging.level = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_loader::parse_pipeline_config;

    fn config(processing: &str) -> PipelineConfig {
        let yaml = format!(
            r#"
paths:
  source_root: /data/merge
  output_root: /data/out
vectors:
  boundary: /data/shapes/uf.shp
  zone_sets:
    - name: ugrhi
      path: /data/shapes/ugrhi.shp
      id_field: codigo
    - name: cities
      path: /data/shapes/cities.shp
      id_field: cd_mun
processing:
{}
"#,
            processing
        );
        parse_pipeline_config(&yaml).unwrap()
    }

    #[test]
    fn test_valid_settings() {
        let settings = PipelineSettings::from_config(config(
            "  target_resolution: 0.025\n  interpolation: cubic\n  statistics: mean max\n  existing_outputs: skip\n  max_parallel_tiles: 4\n  extension: .grib2",
        ))
        .unwrap();
        assert_eq!(settings.interpolation, InterpolationMethod::Cubic);
        assert_eq!(settings.statistics, vec![Statistic::Mean, Statistic::Max]);
        assert_eq!(settings.existing_outputs, ExistingOutputs::Skip);
        assert_eq!(settings.max_parallel_tiles, 4);
        assert_eq!(settings.extension, "grib2");
        assert_eq!(settings.default_crs, CrsCode::Epsg4674);
        assert_eq!(settings.zone_sets[1].id_field, "cd_mun");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/pipeline.yaml");
        let settings = PipelineSettings::load(&path).unwrap();
        assert_eq!(settings.zone_sets.len(), 2);
        assert_eq!(settings.zone_sets[0].name, "ugrhi");
        assert_eq!(settings.statistics.len(), Statistic::ALL.len());
        assert_eq!(settings.existing_outputs, ExistingOutputs::Overwrite);
        assert_eq!(settings.no_data, -9999.0);
    }

    #[test]
    fn test_unknown_statistic_is_fatal() {
        let err = PipelineSettings::from_config(config("  statistics: mean mode")).unwrap_err();
        assert!(matches!(err, PipelineError::Ops(RasterOpsError::UnknownStatistic(s)) if s == "mode"));
    }

    #[test]
    fn test_non_positive_resolution_is_fatal() {
        let err = PipelineSettings::from_config(config("  target_resolution: 0")).unwrap_err();
        assert!(matches!(err, PipelineError::Ops(RasterOpsError::InvalidResolution(_))));
    }

    #[test]
    fn test_unknown_kernel_and_policy() {
        assert!(PipelineSettings::from_config(config("  interpolation: lanczos")).is_err());
        assert!(PipelineSettings::from_config(config("  existing_outputs: append")).is_err());
        assert!(PipelineSettings::from_config(config("  max_parallel_tiles: 0")).is_err());
    }

    #[test]
    fn test_no_data_must_not_collide_with_rainfall() {
        let settings = PipelineSettings::from_config(config("  extension: grib2")).unwrap();
        assert_eq!(settings.no_data, raster_ops::DEFAULT_NO_DATA);

        for value in ["0", "5.5", ".nan"] {
            let err = PipelineSettings::from_config(config(&format!("  no_data: {}", value))).unwrap_err();
            assert!(matches!(err, PipelineError::Config(_)), "{}: {:?}", value, err);
        }
        assert_eq!(
            PipelineSettings::from_config(config("  no_data: -1")).unwrap().no_data,
            -1.0
        );
    }
}
