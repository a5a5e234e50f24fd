//! Single-band Float32 GeoTIFF reader and writer.
//!
//! Georeferencing is carried by the ModelPixelScale (33550) and
//! ModelTiepoint (33922) tags, the CRS by a minimal GeoKeyDirectory (34735)
//! and the no-data sentinel by the GDAL_NODATA ASCII tag (42113), which is
//! what GDAL-based tools read back.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use precip_common::{CrsCode, GeoTransform, RasterGrid};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::atomic::write_atomically;
use crate::error::{RasterIoError, Result};

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Write `grid` as a Float32 GeoTIFF, replacing `path` atomically.
///
/// The grid must be north-up and axis-aligned.
pub fn write_geotiff(path: &Path, grid: &RasterGrid) -> Result<()> {
    grid.ensure_axis_aligned()?;
    if grid.transform().pixel_height > 0.0 {
        return Err(RasterIoError::geotiff(path, "south-up grids cannot be written"));
    }

    write_atomically(path, |file| {
        encode(file, grid).map_err(|e| RasterIoError::geotiff(path, e.to_string()))
    })?;

    debug!(
        path = %path.display(),
        width = grid.width(),
        height = grid.height(),
        crs = %grid.crs(),
        "wrote GeoTIFF"
    );
    Ok(())
}

fn encode(file: &mut File, grid: &RasterGrid) -> tiff::TiffResult<()> {
    let t = grid.transform();
    let (sx, sy) = t.pixel_size();

    let mut encoder = TiffEncoder::new(file)?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(grid.width() as u32, grid.height() as u32)?;

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[sx, sy, 0.0][..])?;
    image.encoder().write_tag(
        Tag::ModelTiepointTag,
        &[0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0][..],
    )?;
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geo_keys(grid.crs())[..])?;
    if let Some(nd) = grid.no_data() {
        image
            .encoder()
            .write_tag(Tag::GdalNodata, nd.to_string().as_str())?;
    }

    image.write_data(grid.data())
}

fn geo_keys(crs: CrsCode) -> [u16; 16] {
    let code = crs.epsg() as u16;
    let (model, key) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE)
    };
    [
        1, 1, 0, 3, // version, revision, minor, key count
        GT_MODEL_TYPE, 0, 1, model,
        GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        key, 0, 1, code,
    ]
}

/// Read a single-band GeoTIFF into a grid.
///
/// Files without a CRS key are assumed to be EPSG:4326.
pub fn read_geotiff(path: &Path) -> Result<RasterGrid> {
    let file = File::open(path).map_err(|e| RasterIoError::open(path, e))?;
    let tiff_err = |e: tiff::TiffError| RasterIoError::geotiff(path, e.to_string());

    let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;
    let (width, height) = decoder.dimensions().map_err(tiff_err)?;

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| RasterIoError::geotiff(path, "missing ModelPixelScale tag"))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| RasterIoError::geotiff(path, "missing ModelTiepoint tag"))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterIoError::geotiff(path, "malformed georeferencing tags"));
    }

    let crs = match decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) {
        Ok(keys) => crs_from_geo_keys(&keys)?,
        Err(_) => {
            warn!(path = %path.display(), "GeoTIFF has no GeoKeyDirectory, assuming EPSG:4326");
            CrsCode::Epsg4326
        }
    };

    let no_data = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let data: Vec<f32> = match decoder.read_image().map_err(tiff_err)? {
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    };

    // Tiepoint [I, J, K, X, Y, Z] maps raster (I, J) to model (X, Y)
    let (sx, sy) = (scale[0], scale[1]);
    let origin_x = tiepoint[3] - tiepoint[0] * sx;
    let origin_y = tiepoint[4] + tiepoint[1] * sy;
    let transform = GeoTransform::north_up(origin_x, origin_y, sx, sy);

    let grid = RasterGrid::new(width as usize, height as usize, data, transform, crs, no_data)?;
    Ok(grid)
}

fn crs_from_geo_keys(keys: &[u16]) -> Result<CrsCode> {
    let mut projected = None;
    let mut geographic = None;
    for entry in keys.chunks_exact(4).skip(1) {
        // Only inline SHORT values (location 0) carry EPSG codes
        if entry[1] != 0 {
            continue;
        }
        match entry[0] {
            PROJECTED_CS_TYPE => projected = Some(entry[3]),
            GEOGRAPHIC_TYPE => geographic = Some(entry[3]),
            _ => {}
        }
    }

    match projected.or(geographic) {
        Some(code) => Ok(CrsCode::from_epsg(code as u32)?),
        None => Ok(CrsCode::Epsg4326),
    }
}
