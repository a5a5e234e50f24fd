//! Hourly precipitation pipeline service.
//!
//! Discovers the day's MERGE GRIB2 tiles, re-grids each to the target
//! resolution, masks it with the state boundary and writes one zonal
//! statistics table per zoning scheme.

pub mod config;
pub mod config_loader;
pub mod discovery;
pub mod error;
pub mod pipeline;

pub use config::{ExistingOutputs, LogFormat, PipelineSettings, ZoneSetSpec};
pub use discovery::{discover_tiles, tile_directory};
pub use error::{PipelineError, Result};
pub use pipeline::{
    process_tile, HourlyPipeline, PipelineRun, RunOutcome, RunReport, RunSummary, SharedVectors,
    Stage, TileRun,
};
