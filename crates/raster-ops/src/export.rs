//! CSV persistence of zonal statistics.

use std::path::Path;

use raster_io::{write_atomically, RasterIoError};

use crate::zonal::ZonalStatisticsResult;

/// Write one row per zone: attribute columns then requested statistics.
///
/// Undefined statistics are written as empty fields. The table replaces
/// `path` atomically.
pub fn write_statistics_csv(path: &Path, result: &ZonalStatisticsResult) -> raster_io::Result<()> {
    write_atomically(path, |file| {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        let csv_err = |e: csv::Error| RasterIoError::io(path, e.into());

        let header = result
            .columns()
            .iter()
            .map(String::as_str)
            .chain(result.statistics().iter().map(|s| s.as_str()));
        writer.write_record(header).map_err(csv_err)?;

        for row in result.rows() {
            let stats = result
                .statistics()
                .iter()
                .map(|s| row.statistics.get(*s).map(|v| v.to_string()).unwrap_or_default());
            let record: Vec<String> = row.attributes.iter().cloned().chain(stats).collect();
            writer.write_record(&record).map_err(csv_err)?;
        }

        writer.flush().map_err(|e| RasterIoError::io(path, e))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zonal::{compute_zonal_statistics, Statistic};
    use geo::{polygon, MultiPolygon};
    use precip_common::{CrsCode, GeoTransform, PolygonZoneSet, RasterGrid, Zone};

    fn zones() -> PolygonZoneSet {
        let zone = |id: &str, name: &str, x0: f64| Zone {
            id: id.to_string(),
            attributes: vec![id.to_string(), name.to_string()],
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: 0.0),
                (x: x0 + 2.0, y: 0.0),
                (x: x0 + 2.0, y: 2.0),
                (x: x0, y: 2.0),
            ]]),
        };
        PolygonZoneSet::new(
            "ugrhi",
            "codigo",
            vec!["codigo".into(), "nome".into()],
            vec![zone("5", "Pardo, Alto", 0.0), zone("9", "Mogi", 10.0)],
            CrsCode::Epsg4326,
        )
        .unwrap()
    }

    #[test]
    fn test_table_layout() {
        let raster = RasterGrid::new(
            4,
            2,
            vec![1.0, 2.0, 9.0, 9.0, 3.0, 4.0, 9.0, 9.0],
            GeoTransform::north_up(0.0, 2.0, 1.0, 1.0),
            CrsCode::Epsg4326,
            None,
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ugrhi_2025-01-15-13.csv");

        compute_zonal_statistics(
            &raster,
            &zones(),
            &[Statistic::Mean, Statistic::Count, Statistic::Max],
            Some(&path),
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "codigo,nome,mean,count,max");
        assert_eq!(lines[1], "5,\"Pardo, Alto\",2.5,4,4");
        // Outside the raster: no cells, empty value fields
        assert_eq!(lines[2], "9,Mogi,,0,");
        assert_eq!(lines.len(), 3);
    }
}
