//! Per-tile orchestration: resample, mask, then one statistics table per
//! zone set.
//!
//! ```text
//! Discovered ──► Resampled ──► Masked ──► StatisticsComputed [Done]
//!     │              │            │              │
//!     └──────────────┴────────────┴──────────────┴──► [Failed { stage }]
//!     └──► [Skipped]   (existing_outputs = skip and all outputs present)
//! ```
//!
//! A failure aborts only its own tile. Tiles run on blocking worker
//! threads, at most `max_parallel_tiles` at a time. Candidates are keyed by
//! [`TileIdentity`]: when several decode to the same run, only the first in
//! batch order is processed and the rest fail at `identify`, so no two
//! workers ever share an artifact path.

use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use precip_common::{Boundary, PolygonZoneSet, TileIdentity};
use raster_ops::{
    compute_zonal_statistics, mask_file, resample_file, RasterOpsError, Statistic,
    ZonalStatisticsResult,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::config::{ExistingOutputs, PipelineSettings};
use crate::discovery::{discover_tiles, tile_directory};
use crate::error::{PipelineError, Result};

/// Processing step a tile failed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Identify,
    Prepare,
    Resample,
    Mask,
    Statistics(String),
    Worker,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identify => write!(f, "identify"),
            Self::Prepare => write!(f, "prepare"),
            Self::Resample => write!(f, "resample"),
            Self::Mask => write!(f, "mask"),
            Self::Statistics(zone_set) => write!(f, "statistics:{}", zone_set),
            Self::Worker => write!(f, "worker"),
        }
    }
}

/// Artifacts of one tile, all derived from its [`TileIdentity`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub source: PathBuf,
    pub identity: TileIdentity,
    /// `<output_root>/<YYYY-MM-DD>`
    pub destination: PathBuf,
    /// `<dest>/<YYYY-MM-DD-HH>.tif`, removed once masked.
    pub resampled: PathBuf,
    /// `<dest>/uf_<YYYY-MM-DD-HH>.tif`
    pub masked: PathBuf,
    /// `(zone set, <dest>/<zone set>_<YYYY-MM-DD-HH>.csv)` in processing order.
    pub tables: Vec<(String, PathBuf)>,
}

impl PipelineRun {
    pub fn plan<'a, I>(source: &Path, output_root: &Path, zone_sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let identity = TileIdentity::decode(&source.to_string_lossy())?;
        let run_id = identity.run_id();
        let destination = output_root.join(identity.date_dir());

        Ok(Self {
            source: source.to_path_buf(),
            identity,
            resampled: destination.join(format!("{}.tif", run_id)),
            masked: destination.join(format!("uf_{}.tif", run_id)),
            tables: zone_sets
                .into_iter()
                .map(|name| {
                    (
                        name.to_string(),
                        destination.join(format!("{}_{}.csv", name, run_id)),
                    )
                })
                .collect(),
            destination,
        })
    }

    /// Whether the final raster and every table already exist.
    pub fn outputs_exist(&self) -> bool {
        self.masked.is_file() && self.tables.iter().all(|(_, p)| p.is_file())
    }
}

/// Terminal state of one tile.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// One result per zone set, in processing order. `leftover` is the
    /// intermediate raster when it could not be removed after masking.
    Done {
        results: Vec<ZonalStatisticsResult>,
        leftover: Option<PathBuf>,
    },
    Skipped,
    Failed { stage: Stage, error: String },
}

impl RunOutcome {
    fn failed(stage: Stage, error: impl fmt::Display) -> Self {
        Self::Failed {
            stage,
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileRun {
    pub source: PathBuf,
    pub identity: Option<TileIdentity>,
    pub outcome: RunOutcome,
}

/// Outcomes of a batch, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub runs: Vec<TileRun>,
}

impl RunReport {
    pub fn done(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Done { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn get(&self, source: &Path) -> Option<&TileRun> {
        self.runs.iter().find(|r| r.source == source)
    }

    fn count(&self, f: impl Fn(&RunOutcome) -> bool) -> usize {
        self.runs.iter().filter(|r| f(&r.outcome)).count()
    }

    /// Serializable overview, without the statistics themselves.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            done: self.done(),
            skipped: self.skipped(),
            failed: self.failed(),
            leftovers: self
                .runs
                .iter()
                .filter_map(|r| match &r.outcome {
                    RunOutcome::Done {
                        leftover: Some(path), ..
                    } => Some(path.display().to_string()),
                    _ => None,
                })
                .collect(),
            failures: self
                .runs
                .iter()
                .filter_map(|r| match &r.outcome {
                    RunOutcome::Failed { stage, error } => Some(FailureSummary {
                        tile: r.source.display().to_string(),
                        stage: stage.to_string(),
                        error: error.clone(),
                    }),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Intermediate rasters that outlived their tile.
    pub leftovers: Vec<String>,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub tile: String,
    pub stage: String,
    pub error: String,
}

/// Read-only inputs shared by every tile.
#[derive(Debug)]
pub struct SharedVectors {
    pub boundary: Boundary,
    pub zone_sets: Vec<PolygonZoneSet>,
}

impl SharedVectors {
    /// Load the boundary and every zone set named in `settings`.
    pub fn load(settings: &PipelineSettings) -> Result<Self> {
        let boundary = raster_io::load_boundary(&settings.boundary, settings.default_crs)?;
        if boundary.is_empty() {
            return Err(RasterOpsError::invalid_mask_geometry(format!(
                "{} holds no polygon",
                settings.boundary.display()
            ))
            .into());
        }

        let zone_sets = settings
            .zone_sets
            .iter()
            .map(|spec| -> Result<PolygonZoneSet> {
                let set = raster_io::load_zone_set(&spec.path, &spec.name, &spec.id_field, settings.default_crs)?;
                if set.polygon_count() == 0 {
                    return Err(RasterOpsError::EmptyZoneSet(spec.name.clone()).into());
                }
                Ok(set)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { boundary, zone_sets })
    }
}

/// Batch driver for hourly tiles.
pub struct HourlyPipeline {
    settings: Arc<PipelineSettings>,
    vectors: Arc<SharedVectors>,
    semaphore: Arc<Semaphore>,
}

impl HourlyPipeline {
    /// Load the shared vectors; any failure here is a startup error.
    pub fn new(settings: PipelineSettings) -> Result<Self> {
        let vectors = SharedVectors::load(&settings)?;
        Ok(Self::with_vectors(settings, vectors))
    }

    pub fn with_vectors(settings: PipelineSettings, vectors: SharedVectors) -> Self {
        let semaphore = Arc::new(Semaphore::new(settings.max_parallel_tiles));
        Self {
            settings: Arc::new(settings),
            vectors: Arc::new(vectors),
            semaphore,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process every tile found for `date`.
    pub async fn run_date(&self, date: NaiveDate) -> RunReport {
        let dir = tile_directory(&self.settings.source_root, date);
        let tiles = discover_tiles(&dir, &self.settings.extension);
        info!(date = %date, dir = %dir.display(), tiles = tiles.len(), "starting batch");
        self.run_tiles(tiles).await
    }

    /// Process `tiles`, keeping their order in the report.
    pub async fn run_tiles(&self, tiles: Vec<PathBuf>) -> RunReport {
        let started = Instant::now();
        let mut claimed: HashMap<TileIdentity, PathBuf> = HashMap::new();

        let tasks: Vec<_> = tiles
            .into_iter()
            .map(|tile| {
                let duplicate = claim(&mut claimed, &tile);
                let sem = self.semaphore.clone();
                let settings = self.settings.clone();
                let vectors = self.vectors.clone();

                async move {
                    if let Some(run) = duplicate {
                        return run;
                    }

                    let _permit = match sem.acquire().await {
                        Ok(p) => p,
                        Err(e) => {
                            return TileRun {
                                source: tile,
                                identity: None,
                                outcome: RunOutcome::failed(Stage::Worker, e),
                            }
                        }
                    };

                    let source = tile.clone();
                    match tokio::task::spawn_blocking(move || process_tile(&settings, &vectors, &tile)).await {
                        Ok(run) => run,
                        Err(e) => {
                            error!(tile = %source.display(), error = %e, "tile worker panicked");
                            TileRun {
                                source,
                                identity: None,
                                outcome: RunOutcome::failed(Stage::Worker, PipelineError::Worker(e.to_string())),
                            }
                        }
                    }
                }
            })
            .collect();

        let runs: Vec<TileRun> = stream::iter(tasks)
            .buffered(self.settings.max_parallel_tiles)
            .collect()
            .await;

        let report = RunReport { runs };
        info!(
            done = report.done(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        report
    }
}

/// Record the run `tile` maps to. Returns a failed run when an earlier
/// candidate already holds it; undecodable names are left to
/// [`process_tile`].
fn claim(claimed: &mut HashMap<TileIdentity, PathBuf>, tile: &Path) -> Option<TileRun> {
    let identity = TileIdentity::decode(&tile.to_string_lossy()).ok()?;
    match claimed.entry(identity) {
        Entry::Vacant(slot) => {
            slot.insert(tile.to_path_buf());
            None
        }
        Entry::Occupied(first) => {
            let err = PipelineError::DuplicateRun {
                run_id: identity.run_id(),
                tile: tile.to_path_buf(),
                first: first.get().clone(),
            };
            warn!(tile = %tile.display(), error = %err, stage = "identify", "tile failed");
            Some(TileRun {
                source: tile.to_path_buf(),
                identity: Some(identity),
                outcome: RunOutcome::failed(Stage::Identify, err),
            })
        }
    }
}

/// Run every stage for one tile. Never panics on bad input; every error is
/// captured in the returned outcome.
#[instrument(skip_all, fields(tile = %source.display()))]
pub fn process_tile(settings: &PipelineSettings, vectors: &SharedVectors, source: &Path) -> TileRun {
    let zone_names = vectors.zone_sets.iter().map(|z| z.name());
    let plan = match PipelineRun::plan(source, &settings.output_root, zone_names) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(error = %e, stage = "identify", "tile failed");
            return TileRun {
                source: source.to_path_buf(),
                identity: None,
                outcome: RunOutcome::failed(Stage::Identify, e),
            };
        }
    };

    let outcome = run_stages(settings, vectors, &plan);
    match &outcome {
        RunOutcome::Done { leftover: None, .. } => info!(run = %plan.identity.run_id(), "tile done"),
        RunOutcome::Done { leftover: Some(path), .. } => warn!(
            run = %plan.identity.run_id(),
            leftover = %path.display(),
            "tile done, intermediate raster left behind"
        ),
        RunOutcome::Skipped => info!(run = %plan.identity.run_id(), "outputs present, tile skipped"),
        RunOutcome::Failed { stage, error } => {
            warn!(run = %plan.identity.run_id(), stage = %stage, error = %error, "tile failed")
        }
    }

    TileRun {
        source: plan.source.clone(),
        identity: Some(plan.identity),
        outcome,
    }
}

fn run_stages(settings: &PipelineSettings, vectors: &SharedVectors, plan: &PipelineRun) -> RunOutcome {
    if settings.existing_outputs == ExistingOutputs::Skip && plan.outputs_exist() {
        return RunOutcome::Skipped;
    }

    if let Err(e) = std::fs::create_dir_all(&plan.destination) {
        return RunOutcome::failed(Stage::Prepare, PipelineError::io(&plan.destination, e));
    }

    if let Err(e) = resample_file(
        &plan.source,
        &plan.resampled,
        settings.target_resolution,
        settings.interpolation,
    ) {
        return RunOutcome::failed(Stage::Resample, e);
    }

    let (masked, leftover) = match mask_file(&plan.resampled, &vectors.boundary, &plan.masked, settings.no_data) {
        Ok(m) => (m.grid, m.leftover),
        Err(e) => return RunOutcome::failed(Stage::Mask, e),
    };

    let mut results = Vec::with_capacity(vectors.zone_sets.len());
    for (zones, (name, table)) in vectors.zone_sets.iter().zip(&plan.tables) {
        let result = match compute_zonal_statistics(&masked, zones, &settings.statistics, Some(table)) {
            Ok(r) => r,
            Err(e) => return RunOutcome::failed(Stage::Statistics(name.clone()), e),
        };

        for row in result.rows() {
            info!(
                zone_set = %name,
                zone = %row.id,
                mean = ?row.statistics.get(Statistic::Mean),
                "zone mean"
            );
        }
        results.push(result);
    }

    RunOutcome::Done { results, leftover }
}
