//! Hourly precipitation pipeline.
//!
//! Processes the MERGE tiles of one day (today by default) into masked
//! GeoTIFFs and per-zone statistics tables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use hourly_pipeline::{HourlyPipeline, LogFormat, PipelineSettings};

#[derive(Parser, Debug)]
#[command(name = "hourly-pipeline")]
#[command(about = "Re-grid, mask and aggregate hourly precipitation tiles")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "PRECIP_CONFIG", default_value = "config/pipeline.yaml")]
    config: PathBuf,

    /// Day to process (YYYY-MM-DD), defaults to the current local date
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Process these files instead of discovering the day's tiles
    #[arg(short, long)]
    file: Vec<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: json or pretty (overrides the configuration file)
    #[arg(long)]
    log_format: Option<String>,

    /// Write a JSON summary of the batch to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let settings = PipelineSettings::load(&args.config)
        .with_context(|| format!("invalid configuration {}", args.config.display()))?;

    // Initialize tracing
    let level = args.log_level.clone().unwrap_or_else(|| settings.log_level.clone());
    let format: LogFormat = match &args.log_format {
        Some(f) => f.parse()?,
        None => settings.log_format,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_thread_ids(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }

    info!(
        config = %args.config.display(),
        source_root = %settings.source_root.display(),
        output_root = %settings.output_root.display(),
        resolution = settings.target_resolution,
        interpolation = %settings.interpolation,
        existing_outputs = %settings.existing_outputs,
        max_parallel_tiles = settings.max_parallel_tiles,
        "Starting hourly precipitation pipeline"
    );

    let pipeline = HourlyPipeline::new(settings).context("failed to load boundary or zone sets")?;

    let report = if args.file.is_empty() {
        let date = args.date.unwrap_or_else(|| Local::now().date_naive());
        pipeline.run_date(date).await
    } else {
        pipeline.run_tiles(args.file.clone()).await
    };

    let summary = report.summary();
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))?;
    }

    if !report.is_success() {
        warn!(failed = summary.failed, "some tiles failed");
        std::process::exit(1);
    }

    Ok(())
}
