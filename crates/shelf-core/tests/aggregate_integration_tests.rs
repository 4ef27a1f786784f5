#![allow(missing_docs)]

use std::{fs, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray},
    datatypes::DataType,
};
use shelf_core::{NewRecord, ScanOptions, Shelf, ShelfError, load_all, load_all_with};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn steps(values: &[i64]) -> Result<RecordBatch, arrow::error::ArrowError> {
    RecordBatch::try_from_iter(vec![(
        "step",
        Arc::new(Int64Array::from(values.to_vec())) as ArrayRef,
    )])
}

fn strings(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>, String> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| format!("no column {name}"))?;
    let arr = col
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| format!("column {name} is {}", col.data_type()))?;
    Ok(arr.iter().map(|v| v.map(str::to_string)).collect())
}

fn ints(batch: &RecordBatch, name: &str) -> Result<Vec<Option<i64>>, String> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| format!("no column {name}"))?;
    let arr = col
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| format!("column {name} is {}", col.data_type()))?;
    Ok(arr.iter().collect())
}

fn two_level_shelf(root: &std::path::Path) -> Result<Shelf, ShelfError> {
    Shelf::builder(root).fields(["experiment", "run"]).build()
}

#[test]
fn rows_and_metadata_columns_round_trip() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = two_level_shelf(tmp.path())?;

    shelf
        .create(
            NewRecord::new()
                .field("experiment", "sweep")
                .field("run", "r1")
                .attribute("model", "linear")
                .attribute("seed", 1i64),
        )?
        .save(&[steps(&[0, 1, 2])?])?;
    shelf
        .create(
            NewRecord::new()
                .field("experiment", "sweep")
                .field("run", "r2")
                .attribute("model", "tree")
                .attribute("seed", 2i64),
        )?
        .save(&[steps(&[0, 1])?])?;

    let tables = shelf.load_all()?;

    assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["data"]);
    let data = &tables["data"];
    assert_eq!(data.num_rows(), 5);
    assert_eq!(ints(data, "step")?, vec![Some(0), Some(1), Some(2), Some(0), Some(1)]);
    assert_eq!(ints(data, "seed")?, vec![Some(1), Some(1), Some(1), Some(2), Some(2)]);
    assert_eq!(
        strings(data, "model")?,
        vec![
            Some("linear".to_string()),
            Some("linear".into()),
            Some("linear".into()),
            Some("tree".into()),
            Some("tree".into()),
        ]
    );
    Ok(())
}

#[test]
fn records_are_visited_in_sorted_order() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    for run in ["c", "a", "b"] {
        shelf
            .create(NewRecord::new().field("run", run).attribute("name", run))?
            .save(&[steps(&[0])?])?;
    }

    let tables = shelf.load_all()?;

    assert_eq!(
        strings(&tables["data"], "name")?,
        vec![Some("a".to_string()), Some("b".into()), Some("c".into())]
    );
    Ok(())
}

#[test]
fn payloads_are_grouped_by_stem() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    let mut r1 = shelf.create(NewRecord::new().field("run", "r1"))?;
    r1.attach(&[steps(&[0, 1])?], "train")?;
    r1.attach(&[steps(&[9])?], "eval")?;
    let mut r2 = shelf.create(NewRecord::new().field("run", "r2"))?;
    r2.attach(&[steps(&[0, 1, 2])?], "train")?;

    let tables = shelf.load_all()?;

    assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["eval", "train"]);
    assert_eq!(tables["train"].num_rows(), 5);
    assert_eq!(tables["eval"].num_rows(), 1);
    Ok(())
}

#[test]
fn records_without_payload_contribute_nothing() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    shelf.create(NewRecord::new().field("run", "pending").attribute("v", 1i64))?;
    shelf
        .create(NewRecord::new().field("run", "done").attribute("v", 2i64))?
        .save(&[steps(&[0])?])?;

    let tables = shelf.load_all()?;

    assert_eq!(tables["data"].num_rows(), 1);
    assert_eq!(ints(&tables["data"], "v")?, vec![Some(2)]);
    Ok(())
}

#[test]
fn empty_shelf_loads_nothing() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = two_level_shelf(tmp.path())?;

    assert!(shelf.load_all()?.is_empty());
    Ok(())
}

#[test]
fn differing_attributes_are_null_filled() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    shelf
        .create(NewRecord::new().field("run", "r1").attribute("lr", 0.5f64))?
        .save(&[steps(&[0])?])?;
    shelf
        .create(NewRecord::new().field("run", "r2").attribute("note", "late"))?
        .save(&[steps(&[0])?])?;

    let tables = shelf.load_all()?;
    let data = &tables["data"];

    let lr = data
        .column_by_name("lr")
        .ok_or("no lr")?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or("lr not Float64")?;
    assert_eq!(lr.iter().collect::<Vec<_>>(), vec![Some(0.5), None]);
    assert_eq!(strings(data, "note")?, vec![None, Some("late".to_string())]);
    Ok(())
}

#[test]
fn attribute_named_like_a_column_collides() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    shelf
        .create(NewRecord::new().field("run", "r1").attribute("step", 5i64))?
        .save(&[steps(&[0])?])?;

    let err = shelf.load_all().expect_err("step is a data column");

    assert!(matches!(
        err,
        ShelfError::MetadataFieldCollision { ref key, .. } if key == "step"
    ));
    Ok(())
}

#[test]
fn malformed_metadata_aborts_the_load() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    let record = shelf.create(NewRecord::new().field("run", "r1"))?;
    fs::write(record.metadata_path(), "{ not json")?;
    fs::write(record.path().join("data.csv"), "step\n0\n")?;

    let err = shelf.load_all().expect_err("broken document");

    assert!(matches!(err, ShelfError::MalformedMetadata { .. }));
    Ok(())
}

#[test]
fn hidden_directories_and_files_are_ignored() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    shelf
        .create(NewRecord::new().field("run", "r1"))?
        .save(&[steps(&[0])?])?;
    fs::create_dir_all(tmp.path().join(".trash"))?;
    fs::write(tmp.path().join(".trash/data.csv"), "step\n7\n")?;
    fs::write(tmp.path().join("r1/.data.csv"), "step\n8\n")?;

    let tables = shelf.load_all()?;

    assert_eq!(ints(&tables["data"], "step")?, vec![Some(0)]);
    Ok(())
}

#[test]
fn field_columns_are_opt_in() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = two_level_shelf(tmp.path())?;

    shelf
        .create(NewRecord::new().field("experiment", "sweep").field("run", 4i64))?
        .save(&[steps(&[0, 1])?])?;

    let plain = load_all(tmp.path())?;
    assert!(plain["data"].column_by_name("experiment").is_none());

    let options = shelf.scan_options().with_field_columns(true);
    let tables = load_all_with(tmp.path(), &options)?;
    let data = &tables["data"];
    assert_eq!(
        strings(data, "experiment")?,
        vec![Some("sweep".to_string()), Some("sweep".into())]
    );
    assert_eq!(data.schema().field_with_name("run")?.data_type(), &DataType::Utf8);
    Ok(())
}

#[test]
fn load_without_manifest_needs_explicit_options() -> TestResult {
    let tmp = TempDir::new()?;
    fs::create_dir_all(tmp.path().join("x/1"))?;
    fs::write(tmp.path().join("x/1/data.csv"), "step\n3\n")?;
    fs::write(tmp.path().join("x/1/metadata.json"), r#"{"tag": "raw"}"#)?;

    let err = load_all(tmp.path()).expect_err("no manifest");
    assert!(matches!(err, ShelfError::MissingManifest { .. }));

    let tables = load_all_with(tmp.path(), &ScanOptions::new(["a", "b"]))?;
    assert_eq!(strings(&tables["data"], "tag")?, vec![Some("raw".to_string())]);
    Ok(())
}

#[test]
fn custom_metadata_name_is_honoured_by_load() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path())
        .field("run")
        .metadata_name("info")
        .build()?;

    shelf
        .create(NewRecord::new().field("run", "r1").attribute("tag", "x"))?
        .save(&[steps(&[0])?])?;

    let tables = load_all(tmp.path())?;

    assert_eq!(strings(&tables["data"], "tag")?, vec![Some("x".to_string())]);
    Ok(())
}

#[test]
fn payload_without_metadata_still_loads() -> TestResult {
    let tmp = TempDir::new()?;
    let shelf = Shelf::builder(tmp.path()).field("run").build()?;

    shelf
        .create(NewRecord::new().field("run", "r1").attribute("seed", 1i64))?
        .save(&[steps(&[0, 1])?])?;
    let bare = shelf.create(NewRecord::new().field("run", "r2"))?;
    fs::remove_file(bare.metadata_path())?;
    fs::write(bare.path().join("data.csv"), "step\n5\n")?;

    let tables = shelf.load_all()?;
    let data = &tables["data"];

    assert_eq!(data.num_rows(), 3);
    assert_eq!(ints(data, "step")?, vec![Some(0), Some(1), Some(5)]);
    assert_eq!(ints(data, "seed")?, vec![Some(1), Some(1), None]);
    Ok(())
}
