// Dataset loading: a real shapefile round-trips into the index, corrupt
// datasets degrade to a partial index, and data-dir enumeration only picks
// up shapefiles.

use std::fs;
use std::path::PathBuf;

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Writer};

use skogsveg::{AttrValue, DatasetConfig, SpatialIndex};

/// Write a one-record deposit dataset: a square polygon with jordart=7.
fn write_deposit_shapefile(path: &PathBuf) {
    let table = TableWriterBuilder::new()
        .add_numeric_field(FieldName::try_from("jordart").unwrap(), 10, 0);
    let mut writer = Writer::from_path(path, table).unwrap();

    let ring = PolygonRing::Outer(vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 100.0),
        Point::new(100.0, 100.0),
        Point::new(100.0, 0.0),
        Point::new(0.0, 0.0),
    ]);
    let polygon = Polygon::with_rings(vec![ring]);

    let mut record = Record::default();
    record.insert("jordart".to_string(), FieldValue::Numeric(Some(7.0)));
    writer.write_shape_and_record(&polygon, &record).unwrap();
}

#[test]
fn shapefile_round_trips_into_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("LosmasseFlate_test.shp");
    write_deposit_shapefile(&path);

    let index = SpatialIndex::build(&[path]);
    assert_eq!(index.len(), 1);

    let hits = index.query(50.0, 50.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].get("jordart").and_then(AttrValue::as_i64), Some(7));

    assert!(index.query(500.0, 500.0).is_empty());
}

#[test]
fn corrupt_dataset_degrades_to_partial_index() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("LosmasseFlate_good.shp");
    write_deposit_shapefile(&good);
    let bogus = dir.path().join("LosmasseFlate_bogus.shp");
    fs::write(&bogus, b"not a shapefile").unwrap();

    let index = SpatialIndex::build(&[bogus, good]);
    assert_eq!(index.len(), 1);
}

#[test]
fn data_dir_enumeration_only_picks_up_shapefiles() {
    let dir = tempfile::tempdir().unwrap();
    let losmasse = dir.path().join("Losmasse");
    fs::create_dir(&losmasse).unwrap();
    write_deposit_shapefile(&losmasse.join("LosmasseFlate_20240621.shp"));
    fs::write(losmasse.join("readme.txt"), b"").unwrap();

    let datasets = DatasetConfig::from_data_dir(dir.path());
    assert_eq!(datasets.deposit_shapefiles.len(), 1);
    assert!(datasets.fjord_shapefiles.is_empty());
}
