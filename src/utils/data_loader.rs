//! Dataset loading and column splitting
//!
//! The pipeline consumes pre-transformed numeric arrays whose last column
//! is the label. CSV input goes through polars and lands in a row-major
//! `Array2<f64>`; column extraction is column-wise for cache-friendly
//! construction.

use crate::error::{CardioError, Result};
use ndarray::{s, Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// The 13 clinical feature columns, in dataset order.
pub const FEATURE_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Label column name.
pub const TARGET_NAME: &str = "target";

/// Load a headered numeric CSV into a row-major array.
pub fn load_csv_matrix(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| CardioError::DataError(format!("cannot open {}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()?;

    dataframe_to_array(&df)
}

/// Convert every column of a DataFrame to f64 and pack them row-major.
pub fn dataframe_to_array(df: &DataFrame) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let col_data: Vec<Vec<f64>> = names
        .iter()
        .map(|name| {
            let series = df.column(name)?;
            let as_f64 = series.cast(&DataType::Float64)?;
            let values: Vec<f64> = as_f64
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, names.len()), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Split a combined array into features (all columns but the last) and
/// labels (the last column).
pub fn split_features_labels(data: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_cols = data.ncols();
    if n_cols < 2 {
        return Err(CardioError::DimensionMismatch {
            expected: 2,
            actual: n_cols,
        });
    }

    let features = data.slice(s![.., ..n_cols - 1]).to_owned();
    let labels = data.column(n_cols - 1).to_owned();
    Ok((features, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_split_last_column_is_label() {
        let data = array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0], [5.0, 6.0, 1.0]];
        let (x, y) = split_features_labels(&data).unwrap();
        assert_eq!(x, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(y, array![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_split_single_column_fails() {
        let data = array![[1.0], [2.0]];
        assert!(matches!(
            split_features_labels(&data),
            Err(CardioError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_dataframe_conversion() {
        let df = df! {
            "a" => [1i64, 2, 3],
            "b" => [0.5f64, 1.5, 2.5],
        }
        .unwrap();
        let arr = dataframe_to_array(&df).unwrap();
        assert_eq!(arr, array![[1.0, 0.5], [2.0, 1.5], [3.0, 2.5]]);
    }

    #[test]
    fn test_load_csv_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b,target\n1,2.5,0\n3,4.5,1\n").unwrap();

        let arr = load_csv_matrix(&path).unwrap();
        assert_eq!(arr, array![[1.0, 2.5, 0.0], [3.0, 4.5, 1.0]]);
    }

    #[test]
    fn test_feature_names_count() {
        assert_eq!(FEATURE_NAMES.len(), 13);
        assert_eq!(FEATURE_NAMES[0], "age");
        assert_eq!(FEATURE_NAMES[12], "thal");
    }
}
