//! Configuration file loader for the hourly pipeline.
//!
//! Reads the YAML pipeline configuration (`pipeline.yaml`) and applies
//! environment variable substitution using `${VAR}` and `${VAR:-default}`
//! syntax before parsing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

// ============================================================================
// Pipeline Configuration (pipeline.yaml)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub vectors: VectorsConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the `<YYYY>/<MM>/<DD>/` source tree.
    pub source_root: String,
    /// Root under which `<YYYY-MM-DD>/` output directories are created.
    pub output_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorsConfig {
    /// CRS assumed for shapefiles without a `.prj` sidecar.
    #[serde(default = "default_crs")]
    pub default_crs: String,
    /// Region-of-interest outline used as cutline.
    pub boundary: String,
    /// Zoning schemes, processed in this order.
    pub zone_sets: Vec<ZoneSetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSetConfig {
    /// Scheme name, used as the CSV filename prefix.
    pub name: String,
    pub path: String,
    /// Attribute holding the unique zone identifier.
    pub id_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_target_resolution")]
    pub target_resolution: f64,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
    /// Space-delimited statistic names.
    #[serde(default = "default_statistics")]
    pub statistics: String,
    /// Written outside the boundary; must not be a possible rainfall value.
    #[serde(default = "default_no_data")]
    pub no_data: f64,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_existing_outputs")]
    pub existing_outputs: String,
    #[serde(default = "default_max_parallel_tiles")]
    pub max_parallel_tiles: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            target_resolution: default_target_resolution(),
            interpolation: default_interpolation(),
            statistics: default_statistics(),
            no_data: default_no_data(),
            extension: default_extension(),
            existing_outputs: default_existing_outputs(),
            max_parallel_tiles: default_max_parallel_tiles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_crs() -> String {
    "EPSG:4674".to_string()
}

fn default_target_resolution() -> f64 {
    0.025
}

fn default_interpolation() -> String {
    "bilinear".to_string()
}

fn default_statistics() -> String {
    "count min max mean sum std median majority minority unique range nodata nan".to_string()
}

fn default_no_data() -> f64 {
    raster_ops::DEFAULT_NO_DATA
}

fn default_extension() -> String {
    "grib2".to_string()
}

fn default_existing_outputs() -> String {
    "overwrite".to_string()
}

fn default_max_parallel_tiles() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and parse the pipeline configuration with environment substitution.
pub fn load_pipeline_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    parse_pipeline_config(&content)
}

/// Parse configuration text with environment substitution.
pub fn parse_pipeline_config(content: &str) -> Result<PipelineConfig> {
    let expanded = expand_env_vars(content)?;
    serde_yaml::from_str(&expanded)
        .map_err(|e| PipelineError::config(format!("failed to parse pipeline config YAML: {}", e)))
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in YAML text.
///
/// Comments are copied verbatim, so placeholders mentioned in them are
/// never resolved. A substitution must close on the line it opens.
pub(crate) fn expand_env_vars(content: &str) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    for (index, line) in content.split_inclusive('\n').enumerate() {
        let (body, comment) = line.split_at(comment_start(line));
        expand_line(body, &mut out)
            .map_err(|msg| PipelineError::config(format!("line {}: {}", index + 1, msg)))?;
        out.push_str(comment);
    }
    Ok(out)
}

/// Byte offset of the `#` opening a YAML comment, or the line length.
///
/// A `#` opens a comment at the start of a line or after whitespace,
/// outside quoted scalars.
fn comment_start(line: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut after_blank = true;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '#' && after_blank => return i,
            None if (c == '"' || c == '\'') && after_blank => quote = Some(c),
            None => {}
        }
        after_blank = c.is_whitespace();
    }
    line.len()
}

fn expand_line(text: &str, out: &mut String) -> std::result::Result<(), String> {
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let expr = &rest[start + 2..];
        let end = expr
            .find('}')
            .ok_or_else(|| format!("unclosed variable substitution: ${{{}", expr.trim_end()))?;
        out.push_str(&resolve_var_expr(&expr[..end])?);
        rest = &expr[end + 1..];
    }
    out.push_str(rest);
    Ok(())
}

/// `NAME` must be set; `NAME:-default` falls back when unset or empty.
fn resolve_var_expr(expr: &str) -> std::result::Result<String, String> {
    let (name, default) = match expr.split_once(":-") {
        Some((name, default)) => (name.trim(), Some(default)),
        None => (expr.trim(), None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid variable name '{}'", name));
    }

    match (std::env::var(name), default) {
        (Ok(value), Some(_)) if !value.is_empty() => Ok(value),
        (_, Some(default)) => Ok(default.to_string()),
        (Ok(value), None) => Ok(value),
        (Err(_), None) => Err(format!("environment variable {} not set", name)),
    }
}
