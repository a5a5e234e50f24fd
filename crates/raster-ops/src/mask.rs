//! Boundary cutline: mask cells outside a polygon and crop to its extent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use precip_common::{Boundary, RasterGrid};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{RasterOpsError, Result};
use crate::rasterize::{rasterize_window, PixelWindow};
use crate::reproject::boundary_to_crs;

/// No-data value written outside the boundary unless configured otherwise.
///
/// Negative so that a dry cell (0 mm) stays a measurement.
pub const DEFAULT_NO_DATA: f64 = -9999.0;

/// A masked raster written by [`mask_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedRaster {
    pub grid: RasterGrid,
    /// Superseded input that could not be removed.
    pub leftover: Option<PathBuf>,
}

/// Set every cell outside `boundary` to `no_data` and crop to its extent.
///
/// The output window is the boundary's bounding box snapped outward to the
/// source pixel grid, so in-boundary values are copied unchanged. Cells of
/// the window that lie outside the source, and source cells that are
/// already no-data, also become `no_data`. The result declares `no_data` as
/// its sentinel.
pub fn mask_and_crop(raster: &RasterGrid, boundary: &Boundary, no_data: f64) -> Result<RasterGrid> {
    if boundary.is_empty() {
        return Err(RasterOpsError::invalid_mask_geometry("boundary contains no polygon"));
    }
    raster.ensure_axis_aligned()?;

    let boundary = boundary_to_crs(boundary, raster.crs())?;
    let bbox = boundary
        .bounds()
        .ok_or_else(|| RasterOpsError::invalid_mask_geometry("boundary has no extent"))?;

    let parent = raster.transform();
    let window = PixelWindow::covering(parent, &bbox);
    if window.is_empty() {
        return Err(RasterOpsError::invalid_mask_geometry(format!(
            "boundary extent {:?} covers no cell",
            bbox
        )));
    }

    let mask = rasterize_window(&boundary.geometry, parent, window);
    let fill = no_data as f32;
    let (src_w, src_h) = (raster.width() as i64, raster.height() as i64);

    let mut output = vec![fill; window.len()];
    output
        .par_chunks_mut(window.width)
        .zip(mask.par_chunks(window.width))
        .enumerate()
        .for_each(|(row, (out_row, mask_row))| {
            let src_row = window.row_off + row as i64;
            if src_row < 0 || src_row >= src_h {
                return;
            }
            for (col, (out, inside)) in out_row.iter_mut().zip(mask_row).enumerate() {
                let src_col = window.col_off + col as i64;
                if *inside == 0 || src_col < 0 || src_col >= src_w {
                    continue;
                }
                let v = raster.data()[(src_row * src_w + src_col) as usize];
                if !raster.is_no_data(v) {
                    *out = v;
                }
            }
        });

    let inside = mask.iter().filter(|m| **m == 1).count();
    debug!(
        col_off = window.col_off,
        row_off = window.row_off,
        width = window.width,
        height = window.height,
        inside,
        "boundary rasterized"
    );

    let grid = RasterGrid::new(
        window.width,
        window.height,
        output,
        window.transform(parent),
        raster.crs(),
        Some(no_data),
    )?;
    Ok(grid)
}

/// Mask the raster at `input` with `boundary` and write it to `output`.
///
/// The masked raster supersedes its input: once `output` is durably in
/// place, `input` is deleted. A deletion failure does not undo the output;
/// the path is returned in [`MaskedRaster::leftover`] instead. On any other
/// failure the input is left untouched and nothing appears under `output`.
pub fn mask_file(input: &Path, boundary: &Boundary, output: &Path, no_data: f64) -> Result<MaskedRaster> {
    let source = raster_io::read_raster(input)?;
    let grid = mask_and_crop(&source, boundary, no_data)?;
    raster_io::write_geotiff(output, &grid).map_err(|e| RasterOpsError::io_write(output, e))?;

    let leftover = if input != output { retire(input) } else { None };

    info!(
        input = %input.display(),
        output = %output.display(),
        width = grid.width(),
        height = grid.height(),
        "masked raster written"
    );
    Ok(MaskedRaster { grid, leftover })
}

/// Remove a superseded artifact. Returns the path when it is still there.
fn retire(path: &Path) -> Option<PathBuf> {
    match std::fs::remove_file(path) {
        Ok(()) => None,
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove superseded raster");
            Some(path.to_path_buf())
        }
    }
}
