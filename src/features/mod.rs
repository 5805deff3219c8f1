//! Feature formatting for the boosted-tree model
//!
//! Splits the cleaned table into a feature matrix and target vector, one-hot
//! expands the multi-category columns, and binarizes the severity target.
//! Every step returns a new value; nothing is mutated in place and row order
//! is preserved throughout.

use crate::dataset::TARGET_COLUMN;
use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Feature matrix with column names kept alongside the values, so the
/// evaluator can label splits by feature name.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub x: Array2<f64>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Separate the target column from the features.
pub fn split_target(df: &DataFrame) -> Result<(DataFrame, Array1<f64>)> {
    let target_series = df
        .column(TARGET_COLUMN)
        .map_err(|_| CardioError::SchemaError {
            column: TARGET_COLUMN.to_string(),
            reason: "missing from dataframe".to_string(),
        })?
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|_| CardioError::TypeCoercion {
            column: TARGET_COLUMN.to_string(),
        })?;

    let y: Array1<f64> = target_series
        .f64()
        .map_err(|e| CardioError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    let x = df.drop(TARGET_COLUMN)?;
    Ok((x, y))
}

/// One-hot expand the named columns.
///
/// For a column with k distinct observed values this produces k indicator
/// columns named `{column}_{value}`, exactly one of which is 1 per row.
/// Columns not listed pass through unchanged and keep their original order,
/// with the indicator columns appended after them.
pub fn one_hot_encode(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    for col_name in columns {
        if df.column(col_name).is_err() {
            return Err(CardioError::SchemaError {
                column: col_name.to_string(),
                reason: "missing from dataframe".to_string(),
            });
        }
    }

    let mut out: Vec<Column> = Vec::new();

    // Passthrough columns first, in original order.
    for col in df.get_columns() {
        if !columns.contains(&col.name().as_str()) {
            out.push(col.clone());
        }
    }

    // Then one indicator group per encoded column, in the order given.
    for col_name in columns {
        let series = df.column(col_name)?.as_materialized_series();
        let values: Vec<f64> = series
            .cast(&DataType::Float64)
            .map_err(|_| CardioError::TypeCoercion {
                column: col_name.to_string(),
            })?
            .f64()
            .map_err(|e| CardioError::DataError(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();

        let mut categories: Vec<f64> = values.clone();
        categories.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        categories.dedup();

        for &category in &categories {
            let name = format!("{}_{}", col_name, fmt_category(category));
            let indicators: Vec<f64> = values
                .iter()
                .map(|&v| if v == category { 1.0 } else { 0.0 })
                .collect();
            out.push(Column::new(name.into(), indicators));
        }
    }

    DataFrame::new(out).map_err(|e| CardioError::DataError(e.to_string()))
}

/// Format a category value for use in an indicator column name.
/// Whole numbers print without the trailing `.0`.
fn fmt_category(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Convert a fully numeric frame into a row-major feature matrix.
pub fn to_matrix(df: &DataFrame) -> Result<FeatureMatrix> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let n_rows = df.height();
    let n_cols = names.len();

    let col_data: Vec<Vec<f64>> = names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| CardioError::SchemaError {
                    column: col_name.clone(),
                    reason: "missing from dataframe".to_string(),
                })?
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|_| CardioError::TypeCoercion {
                    column: col_name.clone(),
                })?;
            let values: Vec<f64> = series
                .f64()
                .map_err(|e| CardioError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    let x = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]);

    Ok(FeatureMatrix { names, x })
}

/// Collapse the 0-4 severity target to binary: 0 stays 0, anything greater
/// becomes 1. Idempotent.
pub fn binarize_target(y: &Array1<f64>) -> Array1<f64> {
    y.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

/// Full formatting pass: split target, one-hot the multi-category columns,
/// coerce to a numeric matrix, binarize the target.
pub fn format_features(df: &DataFrame) -> Result<(FeatureMatrix, Array1<f64>)> {
    let (x_df, y_raw) = split_target(df)?;
    let encoded = one_hot_encode(&x_df, &crate::dataset::categorical_columns())?;
    let matrix = to_matrix(&encoded)?;
    let y = binarize_target(&y_raw);

    if matrix.n_rows() != y.len() {
        return Err(CardioError::ShapeError {
            expected: format!("{} target rows", matrix.n_rows()),
            actual: format!("{}", y.len()),
        });
    }

    tracing::info!(
        rows = matrix.n_rows(),
        features = matrix.n_features(),
        "formatted features"
    );
    Ok((matrix, y))
}
