//! Cleveland heart-disease dataset loading and cleaning
//!
//! The raw file is a headerless, comma-separated table with 13 clinical
//! attributes and one target column. The schema is fixed and declared up
//! front; the loader names the columns and later stages validate against it
//! instead of inferring types ad hoc.

use crate::error::{CardioError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Canonical column names, in file order.
pub const COLUMN_NAMES: [&str; 14] = [
    "age", "sex", "cp", "restbp", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak", "slope",
    "ca", "thal", "hd",
];

/// Target column (heart-disease severity 0-4 in the raw file).
pub const TARGET_COLUMN: &str = "hd";

/// Columns in which the raw file marks missing values with `"?"`.
pub const SENTINEL_COLUMNS: [&str; 2] = ["ca", "thal"];

/// Textual marker standing in for an absent numeric value.
pub const SENTINEL: &str = "?";

/// Semantic type of a column, declared up front rather than discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Continuous measurement (age, blood pressure, ...)
    Continuous,
    /// Two-state categorical already coded as 0/1
    Binary,
    /// Multi-state categorical requiring one-hot expansion
    Categorical,
    /// The prediction target
    Target,
}

/// Declared schema: column name paired with its semantic type.
pub fn schema() -> [(&'static str, ColumnKind); 14] {
    use ColumnKind::*;
    [
        ("age", Continuous),
        ("sex", Binary),
        ("cp", Categorical),
        ("restbp", Continuous),
        ("chol", Continuous),
        ("fbs", Binary),
        ("restecg", Categorical),
        ("thalach", Continuous),
        ("exang", Binary),
        ("oldpeak", Continuous),
        ("slope", Categorical),
        ("ca", Continuous),
        ("thal", Categorical),
        ("hd", Target),
    ]
}

/// Multi-category columns that the feature formatter one-hot expands.
pub fn categorical_columns() -> Vec<&'static str> {
    schema()
        .iter()
        .filter(|(_, kind)| *kind == ColumnKind::Categorical)
        .map(|(name, _)| *name)
        .collect()
}

/// Load the headerless CSV and assign the canonical column names.
///
/// No value-range validation happens here; the file is a fixed, known input.
/// A wrong column count is fatal.
pub fn load(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        CardioError::DataError(format!("cannot open {}: {}", path.display(), e))
    })?;

    // The sentinel can first appear anywhere in the file, so dtype inference
    // must scan every row; a bounded window would type `ca`/`thal` as numeric
    // and choke on a late `?`.
    let parse_opts = CsvParseOptions::default().with_separator(b',');
    let mut df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(None)
        .with_parse_options(parse_opts)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| CardioError::DataError(format!("load: {}", e)))?;

    if df.width() != COLUMN_NAMES.len() {
        return Err(CardioError::SchemaError {
            column: format!("column count {}", df.width()),
            reason: format!("expected {} columns", COLUMN_NAMES.len()),
        });
    }

    df.set_column_names(COLUMN_NAMES)
        .map_err(|e| CardioError::DataError(e.to_string()))?;

    tracing::info!(rows = df.height(), path = %path.display(), "loaded dataset");
    Ok(df)
}

/// Count rows carrying the sentinel in either of the two affected columns.
pub fn sentinel_rows(df: &DataFrame) -> Result<usize> {
    let mut flagged = vec![false; df.height()];
    for col_name in SENTINEL_COLUMNS {
        let column = df
            .column(col_name)
            .map_err(|_| CardioError::SchemaError {
                column: col_name.to_string(),
                reason: "missing from dataframe".to_string(),
            })?;
        let series = column.as_materialized_series();
        if let Ok(ca) = series.str() {
            for (idx, v) in ca.into_iter().enumerate() {
                if v == Some(SENTINEL) {
                    flagged[idx] = true;
                }
            }
        }
    }
    Ok(flagged.iter().filter(|&&f| f).count())
}

/// Replace the sentinel with numeric zero in `ca` and `thal`, then coerce
/// every column to `f64`.
///
/// Post-conditions: neither column contains the sentinel; every column is
/// numeric. The sentinel appearing in any other column, or a column failing
/// numeric coercion, is fatal with a diagnostic naming the column. Row count
/// and order are preserved.
pub fn resolve_missing(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();

    for col_name in SENTINEL_COLUMNS {
        let column = result
            .column(col_name)
            .map_err(|_| CardioError::SchemaError {
                column: col_name.to_string(),
                reason: "missing from dataframe".to_string(),
            })?;
        let series = column.as_materialized_series();

        // Column came in as text only if the sentinel occurred somewhere.
        let replaced = match series.str() {
            Ok(ca) => {
                let values: Vec<Option<&str>> = ca
                    .into_iter()
                    .map(|v| if v == Some(SENTINEL) { Some("0") } else { v })
                    .collect();
                Series::new(col_name.into(), values)
            }
            Err(_) => series.clone(),
        };

        let numeric = cast_column(&replaced, col_name)?;
        result
            .with_column(numeric)
            .map_err(|e| CardioError::DataError(e.to_string()))?;
    }

    // Every remaining column must coerce cleanly; a stray sentinel or other
    // text surfaces here with the offending column named.
    for col_name in COLUMN_NAMES {
        if SENTINEL_COLUMNS.contains(&col_name) {
            continue;
        }
        let series = result.column(col_name)?.as_materialized_series().clone();
        if let Ok(ca) = series.str() {
            if ca.into_iter().any(|v| v == Some(SENTINEL)) {
                return Err(CardioError::SchemaError {
                    column: col_name.to_string(),
                    reason: format!("unexpected sentinel '{}'", SENTINEL),
                });
            }
        }
        let numeric = cast_column(&series, col_name)?;
        result
            .with_column(numeric)
            .map_err(|e| CardioError::DataError(e.to_string()))?;
    }

    tracing::info!(rows = result.height(), "resolved missing values");
    Ok(result)
}

/// Cast a series to `f64`, failing if any value refuses to parse.
fn cast_column(series: &Series, col_name: &str) -> Result<Series> {
    let nulls_before = series.null_count();
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|_| CardioError::TypeCoercion {
            column: col_name.to_string(),
        })?;
    if casted.null_count() > nulls_before {
        return Err(CardioError::TypeCoercion {
            column: col_name.to_string(),
        });
    }
    Ok(casted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_df() -> DataFrame {
        df!(
            "age" => &[63.0, 67.0, 41.0],
            "sex" => &[1.0, 1.0, 0.0],
            "cp" => &[1.0, 4.0, 2.0],
            "restbp" => &[145.0, 160.0, 130.0],
            "chol" => &[233.0, 286.0, 204.0],
            "fbs" => &[1.0, 0.0, 0.0],
            "restecg" => &[2.0, 2.0, 2.0],
            "thalach" => &[150.0, 108.0, 172.0],
            "exang" => &[0.0, 1.0, 0.0],
            "oldpeak" => &[2.3, 1.5, 1.4],
            "slope" => &[3.0, 2.0, 1.0],
            "ca" => &["0.0", "?", "0.0"],
            "thal" => &["6.0", "3.0", "?"],
            "hd" => &[0i64, 2, 1]
        )
        .unwrap()
    }

    #[test]
    fn test_sentinel_rows_counts_union() {
        let df = raw_df();
        assert_eq!(sentinel_rows(&df).unwrap(), 2);
    }

    #[test]
    fn test_resolve_replaces_sentinel_with_zero() {
        let df = raw_df();
        let clean = resolve_missing(&df).unwrap();
        assert_eq!(clean.height(), 3);
        assert_eq!(sentinel_rows(&clean).unwrap(), 0);

        let ca: Vec<f64> = clean
            .column("ca")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(ca, vec![0.0, 0.0, 0.0]);

        let thal: Vec<f64> = clean
            .column("thal")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(thal, vec![6.0, 3.0, 0.0]);
    }

    #[test]
    fn test_resolve_is_all_numeric() {
        let clean = resolve_missing(&raw_df()).unwrap();
        for col in clean.get_columns() {
            assert_eq!(col.dtype(), &DataType::Float64, "column {}", col.name());
        }
    }

    #[test]
    fn test_sentinel_outside_expected_columns_is_fatal() {
        let mut df = raw_df();
        df.with_column(Series::new(
            "restbp".into(),
            &["145.0", "?", "130.0"],
        ))
        .unwrap();
        let err = resolve_missing(&df).unwrap_err();
        match err {
            CardioError::SchemaError { column, .. } => assert_eq!(column, "restbp"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_text_is_type_coercion_error() {
        let mut df = raw_df();
        df.with_column(Series::new("chol".into(), &["233.0", "abc", "204.0"]))
            .unwrap();
        let err = resolve_missing(&df).unwrap_err();
        assert!(matches!(err, CardioError::TypeCoercion { ref column } if column == "chol"));
    }

    #[test]
    fn test_schema_has_four_categorical_columns() {
        assert_eq!(categorical_columns(), vec!["cp", "restecg", "slope", "thal"]);
    }
}
