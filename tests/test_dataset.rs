//! Dataset loading and cleaning against real CSV files on disk

use cardio_boost::dataset;
use cardio_boost::error::CardioError;
use std::io::Write;
use tempfile::NamedTempFile;

/// A headerless slice of the Cleveland file: 8 rows, two of which carry the
/// `?` sentinel (one in `ca`, one in `thal`).
const SAMPLE: &str = "\
63.0,1.0,1.0,145.0,233.0,1.0,2.0,150.0,0.0,2.3,3.0,0.0,6.0,0
67.0,1.0,4.0,160.0,286.0,0.0,2.0,108.0,1.0,1.5,2.0,3.0,3.0,2
67.0,1.0,4.0,120.0,229.0,0.0,2.0,129.0,1.0,2.6,2.0,2.0,7.0,1
37.0,1.0,3.0,130.0,250.0,0.0,0.0,187.0,0.0,3.5,3.0,0.0,3.0,0
41.0,0.0,2.0,130.0,204.0,0.0,2.0,172.0,0.0,1.4,1.0,0.0,3.0,0
56.0,1.0,2.0,120.0,236.0,0.0,0.0,178.0,0.0,0.8,1.0,?,3.0,0
62.0,0.0,4.0,140.0,268.0,0.0,2.0,160.0,0.0,3.6,3.0,2.0,3.0,3
57.0,0.0,4.0,120.0,354.0,0.0,0.0,163.0,1.0,0.6,1.0,0.0,?,0
";

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_names_all_columns() {
    let file = write_csv(SAMPLE);
    let df = dataset::load(file.path()).unwrap();

    assert_eq!(df.height(), 8);
    assert_eq!(df.width(), 14);
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, dataset::COLUMN_NAMES.to_vec());
}

#[test]
fn test_sentinel_rows_counted_before_cleaning() {
    let file = write_csv(SAMPLE);
    let df = dataset::load(file.path()).unwrap();
    assert_eq!(dataset::sentinel_rows(&df).unwrap(), 2);
}

#[test]
fn test_resolve_missing_end_to_end() {
    let file = write_csv(SAMPLE);
    let df = dataset::load(file.path()).unwrap();
    let clean = dataset::resolve_missing(&df).unwrap();

    // Same rows, all numeric, sentinel gone.
    assert_eq!(clean.height(), 8);
    assert_eq!(dataset::sentinel_rows(&clean).unwrap(), 0);

    let ca: Vec<f64> = clean
        .column("ca")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ca[5], 0.0);

    let thal: Vec<f64> = clean
        .column("thal")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(thal[7], 0.0);
}

#[test]
fn test_wrong_column_count_is_schema_error() {
    // 13 fields per row instead of 14.
    let file = write_csv("63.0,1.0,1.0,145.0,233.0,1.0,2.0,150.0,0.0,2.3,3.0,0.0,6.0\n");
    let err = dataset::load(file.path()).unwrap_err();
    assert!(matches!(err, CardioError::SchemaError { .. }));
}

#[test]
fn test_sentinel_in_unexpected_column_names_it() {
    let with_bad_restbp = SAMPLE.replace("37.0,1.0,3.0,130.0", "37.0,1.0,3.0,?");
    let file = write_csv(&with_bad_restbp);
    let df = dataset::load(file.path()).unwrap();
    let err = dataset::resolve_missing(&df).unwrap_err();
    match err {
        CardioError::SchemaError { column, .. } => assert_eq!(column, "restbp"),
        CardioError::TypeCoercion { column } => assert_eq!(column, "restbp"),
        other => panic!("expected a restbp diagnostic, got {:?}", other),
    }
}

#[test]
fn test_sentinel_deep_in_file_still_loads() {
    // In the real Cleveland file the first `?` shows up past row 100, so the
    // sentinel columns must not be typed from an early prefix of the rows.
    let mut contents = String::new();
    for i in 0..150 {
        let ca = if i == 119 { "?".to_string() } else { format!("{}.0", i % 4) };
        contents.push_str(&format!(
            "{}.0,1.0,{}.0,130.0,250.0,0.0,2.0,150.0,0.0,1.0,2.0,{},3.0,{}\n",
            40 + i % 30,
            1 + i % 4,
            ca,
            i % 2
        ));
    }
    let file = write_csv(&contents);

    let df = dataset::load(file.path()).unwrap();
    assert_eq!(df.height(), 150);
    assert_eq!(dataset::sentinel_rows(&df).unwrap(), 1);

    let clean = dataset::resolve_missing(&df).unwrap();
    let ca: Vec<f64> = clean
        .column("ca")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ca[119], 0.0);
    assert_eq!(ca[118], 2.0);
}

#[test]
fn test_missing_file_is_reported() {
    let err = dataset::load("/nonexistent/heart.data").unwrap_err();
    assert!(matches!(err, CardioError::DataError(_)));
}
