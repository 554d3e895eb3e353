//! Feature encoding
//!
//! Turns a [`Dataset`] into a dense numeric matrix:
//! - numeric columns are standardized to zero mean and unit variance
//! - categorical columns are one-hot encoded in first-seen category order
//!
//! The resulting [`FeatureLayout`] is frozen and can encode further datasets
//! with the same column layout. Unseen categories encode to all-zero
//! indicators rather than failing.

mod encoder;
mod scaler;

pub use encoder::OneHotEncoder;
pub use scaler::StandardScaler;

use crate::dataset::{ColumnValues, Dataset};
use crate::error::{AnomalyError, Result};
use ndarray::Array2;
use tracing::debug;

/// Dense row-major feature matrix, one row per dataset row
pub type NumericMatrix = Array2<f64>;

/// Fitted numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct NumericFeature {
    /// Source column name
    pub name: String,
    /// Mean and population std frozen at fit time
    pub scaler: StandardScaler,
}

/// Fitted categorical column
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalFeature {
    /// Source column name
    pub name: String,
    /// Category vocabulary in first-seen order
    pub encoder: OneHotEncoder,
}

/// Frozen mapping from dataset columns to matrix columns.
///
/// Matrix columns are the standardized numeric columns in dataset order,
/// followed by one indicator block per categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    numeric: Vec<NumericFeature>,
    categorical: Vec<CategoricalFeature>,
}

impl FeatureLayout {
    /// Fit scaling parameters and vocabularies on `dataset`
    pub fn fit(dataset: &Dataset) -> Result<Self> {
        check_encodable(dataset)?;

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for col in dataset.columns() {
            match &col.values {
                ColumnValues::Numeric(values) => numeric.push(NumericFeature {
                    name: col.name.clone(),
                    scaler: StandardScaler::fit(values),
                }),
                ColumnValues::Categorical(values) => categorical.push(CategoricalFeature {
                    name: col.name.clone(),
                    encoder: OneHotEncoder::fit(values),
                }),
                ColumnValues::Unsupported { .. } => {}
            }
        }

        Ok(Self { numeric, categorical })
    }

    /// Encode `dataset` with this layout.
    ///
    /// Every layout column must be present with the same kind; extra columns
    /// are ignored.
    pub fn transform(&self, dataset: &Dataset) -> Result<NumericMatrix> {
        let n_rows = dataset.n_rows();
        let mut matrix = Array2::<f64>::zeros((n_rows, self.n_features()));

        for (j, feature) in self.numeric.iter().enumerate() {
            let values = match dataset.column(&feature.name).map(|c| &c.values) {
                Some(ColumnValues::Numeric(values)) => values,
                Some(_) => {
                    return Err(AnomalyError::Encoding(format!(
                        "column '{}' is not numeric",
                        feature.name
                    )))
                }
                None => {
                    return Err(AnomalyError::Encoding(format!(
                        "column '{}' is missing",
                        feature.name
                    )))
                }
            };
            for (i, &v) in values.iter().enumerate() {
                matrix[[i, j]] = feature.scaler.scale(v);
            }
        }

        let mut offset = self.numeric.len();
        for feature in &self.categorical {
            let values = match dataset.column(&feature.name).map(|c| &c.values) {
                Some(ColumnValues::Categorical(values)) => values,
                Some(_) => {
                    return Err(AnomalyError::Encoding(format!(
                        "column '{}' is not categorical",
                        feature.name
                    )))
                }
                None => {
                    return Err(AnomalyError::Encoding(format!(
                        "column '{}' is missing",
                        feature.name
                    )))
                }
            };
            for (i, v) in values.iter().enumerate() {
                if let Some(pos) = feature.encoder.position(v) {
                    matrix[[i, offset + pos]] = 1.0;
                }
            }
            offset += feature.encoder.len();
        }

        Ok(matrix)
    }

    /// Numeric column names in matrix order
    pub fn numeric_columns(&self) -> Vec<String> {
        self.numeric.iter().map(|f| f.name.clone()).collect()
    }

    /// Categorical column names in matrix order
    pub fn categorical_columns(&self) -> Vec<String> {
        self.categorical.iter().map(|f| f.name.clone()).collect()
    }

    pub fn numeric_features(&self) -> &[NumericFeature] {
        &self.numeric
    }

    pub fn categorical_features(&self) -> &[CategoricalFeature] {
        &self.categorical
    }

    /// Frozen vocabulary of a categorical column
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.categorical
            .iter()
            .find(|f| f.name == column)
            .map(|f| f.encoder.categories())
    }

    /// Total number of matrix columns
    pub fn n_features(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|f| f.encoder.len()).sum::<usize>()
    }

    /// Matrix column names: `<numeric>` then `<categorical>=<value>`
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns();
        for feature in &self.categorical {
            for cat in feature.encoder.categories() {
                names.push(format!("{}={}", feature.name, cat));
            }
        }
        names
    }
}

/// Encode a dataset into `(matrix, layout)`
pub fn encode(dataset: &Dataset) -> Result<(NumericMatrix, FeatureLayout)> {
    let layout = FeatureLayout::fit(dataset)?;
    let matrix = layout.transform(dataset)?;

    debug!(
        rows = matrix.nrows(),
        features = matrix.ncols(),
        numeric = layout.numeric.len(),
        categorical = layout.categorical.len(),
        "Encoded dataset"
    );

    Ok((matrix, layout))
}

fn check_encodable(dataset: &Dataset) -> Result<()> {
    if dataset.n_rows() == 0 {
        return Err(AnomalyError::InvalidDataset("dataset has no rows".to_string()));
    }

    let summary = dataset.inspect();
    if summary.numeric.is_empty() && summary.categorical.is_empty() {
        return Err(AnomalyError::InvalidDataset(
            "dataset has no numeric or categorical columns".to_string(),
        ));
    }
    if let Some(name) = summary.unsupported.first() {
        return Err(AnomalyError::Encoding(format!(
            "column '{}' is neither numeric nor categorical",
            name
        )));
    }

    for col in dataset.columns() {
        if let ColumnValues::Numeric(values) = &col.values {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(AnomalyError::InvalidDataset(format!(
                    "numeric column '{}' contains non-finite values",
                    col.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> Dataset {
        Dataset::builder()
            .numeric("cost", vec![100.0, 110.0, 90.0, 105.0, 95.0])
            .categorical("region", ["north", "south", "north", "east", "south"])
            .numeric("flat", vec![3.0; 5])
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout_order() {
        let (matrix, layout) = encode(&mixed()).unwrap();
        assert_eq!(matrix.dim(), (5, 5));
        assert_eq!(layout.numeric_columns(), vec!["cost", "flat"]);
        assert_eq!(layout.categorical_columns(), vec!["region"]);
        assert_eq!(
            layout.feature_names(),
            vec!["cost", "flat", "region=north", "region=south", "region=east"]
        );
        assert_eq!(layout.vocabulary("region").unwrap(), &["north", "south", "east"]);
    }

    #[test]
    fn test_standardized_column() {
        let (matrix, _) = encode(&mixed()).unwrap();
        let col = matrix.column(0);
        let n = col.len() as f64;
        let mean = col.sum() / n;
        let std = (col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        assert!(mean.abs() < 1e-10);
        assert!((std - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_variance_column_is_zero() {
        let (matrix, _) = encode(&mixed()).unwrap();
        assert!(matrix.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_one_hot_rows() {
        let (matrix, _) = encode(&mixed()).unwrap();
        for i in 0..5 {
            let block = matrix.row(i).slice(ndarray::s![2..]).to_vec();
            assert_eq!(block.iter().sum::<f64>(), 1.0);
        }
        assert_eq!(matrix[[3, 4]], 1.0);
    }

    #[test]
    fn test_unseen_category_transform() {
        let (_, layout) = encode(&mixed()).unwrap();
        let other = Dataset::builder()
            .numeric("cost", vec![100.0])
            .categorical("region", ["west"])
            .numeric("flat", vec![3.0])
            .build()
            .unwrap();
        let matrix = layout.transform(&other).unwrap();
        assert_eq!(matrix.row(0).slice(ndarray::s![2..]).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_missing_column() {
        let (_, layout) = encode(&mixed()).unwrap();
        let other = Dataset::builder().numeric("cost", vec![1.0]).build().unwrap();
        assert!(matches!(layout.transform(&other), Err(AnomalyError::Encoding(_))));
    }

    #[test]
    fn test_encode_is_idempotent() {
        let ds = mixed();
        let (m1, l1) = encode(&ds).unwrap();
        let (m2, l2) = encode(&ds).unwrap();
        assert_eq!(m1, m2);
        assert_eq!(l1, l2);
    }

    #[test]
    fn test_empty_dataset() {
        let ds = Dataset::builder().numeric("cost", vec![]).build().unwrap();
        assert!(matches!(encode(&ds), Err(AnomalyError::InvalidDataset(_))));
    }

    #[test]
    fn test_no_usable_columns() {
        let ds = Dataset::builder().unsupported("when", "date", 3).build().unwrap();
        assert!(matches!(encode(&ds), Err(AnomalyError::InvalidDataset(_))));
    }

    #[test]
    fn test_unsupported_column_is_encoding_error() {
        let ds = Dataset::builder()
            .numeric("cost", vec![1.0, 2.0])
            .unsupported("when", "date", 2)
            .build()
            .unwrap();
        assert!(matches!(encode(&ds), Err(AnomalyError::Encoding(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let ds = Dataset::builder()
            .numeric("cost", vec![1.0, f64::NAN])
            .build()
            .unwrap();
        assert!(matches!(encode(&ds), Err(AnomalyError::InvalidDataset(_))));
    }
}
