//! Error types for the pipeline service.

use std::path::PathBuf;

use precip_common::IdentityError;
use raster_io::RasterIoError;
use raster_ops::RasterOpsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid or incomplete configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    MalformedFilename(#[from] IdentityError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A vector or raster input could not be loaded.
    #[error(transparent)]
    Input(#[from] RasterIoError),

    /// A processing stage failed.
    #[error(transparent)]
    Ops(#[from] RasterOpsError),

    /// Another candidate in the batch already maps to the same run.
    #[error("{} duplicates run {run_id} already claimed by {}", tile.display(), first.display())]
    DuplicateRun {
        run_id: String,
        tile: PathBuf,
        first: PathBuf,
    },

    /// A blocking worker panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
