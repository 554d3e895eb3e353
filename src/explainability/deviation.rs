//! Univariate deviation explanations for flagged rows

use crate::dataset::{ColumnValues, Dataset, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Rendered when no single feature crosses the threshold
pub const FALLBACK_EXPLANATION: &str = "Unusual combination of features (no single dominant cause)";

/// Label given to rows that were not flagged
pub const NORMAL_LABEL: &str = "Normal behavior";

/// Mean and sample standard deviation of one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); 0 with fewer than two rows
    pub std: f64,
}

impl ColumnReference {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self { mean: 0.0, std: 0.0 };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        if n < 2 {
            return Self { mean, std: 0.0 };
        }
        let var = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Self { mean, std: var.sqrt() }
    }

    /// Absolute z-score of `value`, `None` for zero-variance columns
    pub fn z_score(&self, value: f64) -> Option<f64> {
        (self.std > 0.0).then(|| (value - self.mean).abs() / self.std)
    }
}

/// Population statistics of every numeric column of the scored dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    columns: HashMap<String, ColumnReference>,
}

impl ReferenceStats {
    /// Compute statistics over the full dataset
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let columns = dataset
            .columns()
            .iter()
            .filter_map(|col| match &col.values {
                ColumnValues::Numeric(values) => {
                    Some((col.name.clone(), ColumnReference::from_values(values)))
                }
                _ => None,
            })
            .collect();
        Self { columns }
    }

    pub fn insert(&mut self, column: impl Into<String>, reference: ColumnReference) {
        self.columns.insert(column.into(), reference);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnReference> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One feature beyond the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDeviation {
    /// Numeric column name
    pub feature: String,
    /// Absolute z-score of the row's value against the reference stats
    pub z_score: f64,
}

/// Ordered deviations for one row, largest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Deviations sorted by descending z-score
    pub deviations: Vec<FeatureDeviation>,
}

impl Explanation {
    /// True when no feature crossed the threshold
    pub fn is_unattributed(&self) -> bool {
        self.deviations.is_empty()
    }

    /// Feature names in explanation order
    pub fn features(&self) -> Vec<&str> {
        self.deviations.iter().map(|d| d.feature.as_str()).collect()
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deviations.is_empty() {
            return f.write_str(FALLBACK_EXPLANATION);
        }
        for (i, d) in self.deviations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} deviates by {:.2}σ from normal", d.feature, d.z_score)?;
        }
        Ok(())
    }
}

/// Collect numeric columns whose |z| reaches `z_threshold`, largest first.
///
/// Columns missing from the row or the statistics, and zero-variance
/// columns, are skipped. Equal z-scores keep `numeric_columns` order.
pub fn explain_deviations(
    row: &Row<'_>,
    reference_stats: &ReferenceStats,
    numeric_columns: &[String],
    z_threshold: f64,
) -> Explanation {
    let mut deviations: Vec<FeatureDeviation> = numeric_columns
        .iter()
        .filter_map(|col| {
            let value = row.number(col)?;
            let z_score = reference_stats.get(col)?.z_score(value)?;
            (z_score >= z_threshold).then(|| FeatureDeviation {
                feature: col.clone(),
                z_score,
            })
        })
        .collect();

    deviations.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));
    Explanation { deviations }
}

/// Render the explanation string for one flagged row
pub fn explain(
    row: &Row<'_>,
    reference_stats: &ReferenceStats,
    numeric_columns: &[String],
    z_threshold: f64,
) -> String {
    explain_deviations(row, reference_stats, numeric_columns, z_threshold).to_string()
}
