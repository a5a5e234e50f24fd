//! Resample, mask and zonal statistics chained over synthetic tiles.

use geo::{polygon, MultiPolygon};
use precip_common::crs::Datum;
use precip_common::{Boundary, CrsCode};
use raster_io::{load_boundary, load_zone_set, read_geotiff};
use raster_ops::{
    compute_zonal_statistics, mask_and_crop, mask_file, parse_statistics, resample, resample_file,
    InterpolationMethod, RasterOpsError, Statistic, DEFAULT_NO_DATA,
};
use test_utils::{
    assert_approx_eq, prj, raster_from_fn, square, uniform_raster, Grib2Builder, ShapefileFixture,
};

/// Boundary well inside the synthetic MERGE tile (-50.1..-49.1, -21.0..-20.0).
fn write_boundary(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("uf.shp");
    ShapefileFixture::new()
        .text_field("sigla")
        .polygon(square(-50.0, -20.9, 0.8), &["SP"])
        .with_prj(prj::SIRGAS_2000)
        .write(&path)
        .unwrap();
    path
}

fn write_zones(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("ugrhi.shp");
    ShapefileFixture::new()
        .text_field("codigo")
        .text_field("nome")
        .polygon(square(-49.9, -20.5, 0.2), &["1", "Mantiqueira"])
        .polygon(square(-49.5, -20.5, 0.2), &["2", "Paraiba do Sul"])
        // Straddles the eastern boundary edge
        .polygon(square(-49.3, -20.5, 0.2), &["3", "Litoral Norte"])
        .with_prj(prj::SIRGAS_2000)
        .write(&path)
        .unwrap();
    path
}

#[test]
fn test_uniform_tile_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let tile = dir.path().join("MERGE_CPTEC_2025011513.grib2");
    Grib2Builder::new_merge()
        .with_constant_value(5.0)
        .write_to(&tile)
        .unwrap();

    let resampled_path = dir.path().join("2025-01-15-13.tif");
    let masked_path = dir.path().join("uf_2025-01-15-13.tif");
    let table = dir.path().join("ugrhi_2025-01-15-13.csv");

    let resampled = resample_file(&tile, &resampled_path, 0.025, InterpolationMethod::Bilinear).unwrap();
    // Four times the density on each axis
    assert_eq!((resampled.width(), resampled.height()), (40, 40));
    assert!(tile.exists());

    let boundary = load_boundary(&write_boundary(dir.path()), CrsCode::Epsg4674).unwrap();
    let masked = mask_file(&resampled_path, &boundary, &masked_path, DEFAULT_NO_DATA).unwrap();
    assert!(!resampled_path.exists());
    assert_eq!(masked.leftover, None);
    let masked = masked.grid;
    assert_eq!((masked.width(), masked.height()), (32, 32));
    assert_eq!(masked.no_data(), Some(DEFAULT_NO_DATA));

    let zones = load_zone_set(&write_zones(dir.path()), "ugrhi", "codigo", CrsCode::Epsg4674).unwrap();
    let stats = parse_statistics("count min max mean sum std median").unwrap();
    let result = compute_zonal_statistics(&read_geotiff(&masked_path).unwrap(), &zones, &stats, Some(&table)).unwrap();

    for id in ["1", "2"] {
        let s = result.get(id).unwrap();
        assert_eq!(s.get(Statistic::Count), Some(64.0));
        assert_approx_eq!(s.get(Statistic::Mean).unwrap(), 5.0, 1e-5);
        assert_approx_eq!(s.get(Statistic::Min).unwrap(), 5.0, 1e-5);
        assert_approx_eq!(s.get(Statistic::Max).unwrap(), 5.0, 1e-5);
        assert_approx_eq!(s.get(Statistic::Sum).unwrap(), 320.0, 1e-3);
        assert_approx_eq!(s.get(Statistic::Std).unwrap(), 0.0, 1e-5);
        assert_approx_eq!(s.get(Statistic::Median).unwrap(), 5.0, 1e-5);
    }
    // Only the half inside the cropped window is sampled
    assert_eq!(result.get("3").unwrap().get(Statistic::Count), Some(32.0));

    let csv = std::fs::read_to_string(&table).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("codigo,nome,count,min,max,mean,sum,std,median"));
    assert_eq!(lines.count(), 3);
}

#[test]
fn test_masked_cells_never_reach_statistics() {
    // Column index as the value; everything east of x = 5 is masked away
    let grid = raster_from_fn(10, 10, (0.0, 10.0), 1.0, |col, _| col as f32 + 1.0);
    let boundary = Boundary::new(
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 10.0), (x: 0.0, y: 10.0),
        ]]),
        CrsCode::Epsg4326,
    );
    let masked = mask_and_crop(&grid, &boundary, -9999.0).unwrap();
    assert_eq!(masked.width(), 5);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zones.shp");
    ShapefileFixture::new()
        .text_field("cd_mun")
        .polygon(square(0.0, 0.0, 10.0), &["3550308"])
        .write(&path)
        .unwrap();
    let zones = load_zone_set(&path, "cities", "cd_mun", CrsCode::Epsg4326).unwrap();

    let result = compute_zonal_statistics(
        &masked,
        &zones,
        &[Statistic::Count, Statistic::Max, Statistic::Nodata],
        None,
    )
    .unwrap();
    let s = result.get("3550308").unwrap();
    assert_eq!(s.get(Statistic::Count), Some(50.0));
    assert_eq!(s.get(Statistic::Max), Some(5.0));
    assert_eq!(s.get(Statistic::Nodata), Some(0.0));
}

#[test]
fn test_dry_cells_count_as_zero_rain() {
    // West half dry, east half 10 mm
    let grid = raster_from_fn(10, 10, (0.0, 10.0), 1.0, |col, _| if col < 5 { 0.0 } else { 10.0 });
    let boundary = Boundary::new(
        MultiPolygon(vec![polygon![
            (x: -1.0, y: -1.0), (x: 11.0, y: -1.0), (x: 11.0, y: 11.0), (x: -1.0, y: 11.0),
        ]]),
        CrsCode::Epsg4326,
    );
    let masked = mask_and_crop(&grid, &boundary, DEFAULT_NO_DATA).unwrap();
    assert_eq!(masked.valid_count(), 100);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zones.shp");
    ShapefileFixture::new()
        .text_field("codigo")
        .polygon(square(0.0, 0.0, 10.0), &["mixed"])
        .polygon(square(0.0, 0.0, 5.0), &["dry"])
        .write(&path)
        .unwrap();
    let zones = load_zone_set(&path, "ugrhi", "codigo", CrsCode::Epsg4326).unwrap();

    let table = dir.path().join("ugrhi_2025-01-15-13.csv");
    let stats = [Statistic::Count, Statistic::Mean, Statistic::Max, Statistic::Nodata];
    let result = compute_zonal_statistics(&masked, &zones, &stats, Some(&table)).unwrap();

    let mixed = result.get("mixed").unwrap();
    assert_eq!(mixed.get(Statistic::Count), Some(100.0));
    assert_eq!(mixed.get(Statistic::Mean), Some(5.0));
    assert_eq!(mixed.get(Statistic::Nodata), Some(0.0));

    let dry = result.get("dry").unwrap();
    assert_eq!(dry.get(Statistic::Count), Some(25.0));
    assert_eq!(dry.get(Statistic::Mean), Some(0.0));
    assert_eq!(dry.get(Statistic::Max), Some(0.0));

    let csv = std::fs::read_to_string(&table).unwrap();
    assert!(csv.lines().any(|l| l == "dry,25,0,0,0"), "{}", csv);
}

#[test]
fn test_no_data_and_nan_are_counted_separately() {
    let mut grid = uniform_raster(4, 4, (0.0, 4.0), 1.0, 2.0);
    let mut data = grid.clone().into_data();
    data[0] = f32::NAN;
    data[5] = -9999.0;
    data[6] = -9999.0;
    grid = precip_common::RasterGrid::new(4, 4, data, *grid.transform(), grid.crs(), Some(-9999.0)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zones.shp");
    ShapefileFixture::new()
        .text_field("codigo")
        .polygon(square(0.0, 0.0, 4.0), &["7"])
        .write(&path)
        .unwrap();
    let zones = load_zone_set(&path, "ugrhi", "codigo", CrsCode::Epsg4326).unwrap();

    let result = compute_zonal_statistics(&grid, &zones, &Statistic::ALL, None).unwrap();
    let s = result.get("7").unwrap();
    assert_eq!(s.get(Statistic::Count), Some(13.0));
    assert_eq!(s.get(Statistic::Nodata), Some(2.0));
    assert_eq!(s.get(Statistic::Nan), Some(1.0));
    assert_eq!(s.get(Statistic::Mean), Some(2.0));
    assert_eq!(s.get(Statistic::Unique), Some(1.0));
}

#[test]
fn test_projected_zones_are_reprojected() {
    let utm = CrsCode::Utm {
        zone: 23,
        south: true,
        datum: Datum::Sirgas2000,
    };
    // 0.01° cells around the zone 23 central meridian
    let grid = uniform_raster(200, 200, (-46.0, -22.0), 0.01, 3.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zones.shp");
    ShapefileFixture::new()
        .text_field("codigo")
        .polygon(square(480_000.0, 7_460_000.0, 40_000.0), &["11"])
        .with_prj(prj::SIRGAS_2000_UTM_23S_ESRI)
        .write(&path)
        .unwrap();
    let zones = load_zone_set(&path, "ugrhi", "codigo", CrsCode::Epsg4674).unwrap();
    assert_eq!(zones.crs(), utm);

    let result = compute_zonal_statistics(&grid, &zones, &[Statistic::Count, Statistic::Mean], None).unwrap();
    let s = result.get("11").unwrap();
    // Roughly 0.38° x 0.36° of 0.01° cells
    let count = s.get(Statistic::Count).unwrap();
    assert!(count > 1200.0 && count < 1500.0, "count = {}", count);
    assert_eq!(s.get(Statistic::Mean), Some(3.0));
}

#[test]
fn test_zone_set_without_polygons() {
    let grid = uniform_raster(2, 2, (0.0, 2.0), 1.0, 1.0);
    let empty = precip_common::PolygonZoneSet::new("cities", "cd_mun", vec!["cd_mun".into()], vec![], CrsCode::Epsg4326)
        .unwrap();
    assert!(matches!(
        compute_zonal_statistics(&grid, &empty, &[Statistic::Count], None),
        Err(RasterOpsError::EmptyZoneSet(name)) if name == "cities"
    ));
}

#[test]
fn test_resolution_is_checked_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("MERGE_CPTEC_2025011513.grib2");
    let err = resample_file(&missing, &dir.path().join("out.tif"), 0.0, InterpolationMethod::Nearest).unwrap_err();
    assert!(matches!(err, RasterOpsError::InvalidResolution(_)));

    let grid = uniform_raster(2, 2, (0.0, 2.0), 1.0, 1.0);
    assert!(resample(&grid, -1.0, InterpolationMethod::Nearest).is_err());
}
