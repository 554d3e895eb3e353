//! Tabular dataset model
//!
//! A [`Dataset`] is an ordered set of named, typed columns. Column kinds are
//! fixed when the dataset is built and never change afterwards; the encoder,
//! the ensemble and the explainer all read the same immutable value.

mod loader;

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of a dataset column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Any other source type (dates, lists, binary ...). Kept so it can be
    /// reported, but never encodable.
    Unsupported(String),
}

/// Values stored for a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
    Unsupported { dtype: String, len: usize },
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
            ColumnValues::Unsupported { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Categorical(_) => ColumnKind::Categorical,
            ColumnValues::Unsupported { dtype, .. } => ColumnKind::Unsupported(dtype.clone()),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn kind(&self) -> ColumnKind {
        self.values.kind()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Numeric(_))
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.values, ColumnValues::Categorical(_))
    }
}

/// A single cell value seen through a [`Row`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Number(f64),
    Category(&'a str),
    Unsupported,
}

impl Value<'_> {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Column names grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub unsupported: Vec<String>,
}

/// Immutable tabular dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Start building a dataset column by column
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric column names, in column order
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Categorical column names, in column order
    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_categorical())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Group column names by kind
    pub fn inspect(&self) -> ColumnSummary {
        let mut summary = ColumnSummary::default();
        for col in &self.columns {
            match col.values {
                ColumnValues::Numeric(_) => summary.numeric.push(col.name.clone()),
                ColumnValues::Categorical(_) => summary.categorical.push(col.name.clone()),
                ColumnValues::Unsupported { .. } => summary.unsupported.push(col.name.clone()),
            }
        }
        summary
    }

    /// Non-fatal validation issues, empty when the dataset looks usable
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.n_rows == 0 {
            issues.push("Dataset is empty".to_string());
        }
        if self.columns.is_empty() {
            issues.push("No columns detected".to_string());
        }

        let summary = self.inspect();
        if !self.columns.is_empty() && summary.numeric.is_empty() && summary.categorical.is_empty() {
            issues.push("No numeric or categorical columns".to_string());
        }
        for name in &summary.unsupported {
            issues.push(format!("Column '{}' has an unsupported type", name));
        }

        issues
    }

    /// Row view at `index`, or `None` when out of range
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.n_rows).then_some(Row { dataset: self, index })
    }

    /// Iterate over all rows in order
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.n_rows).map(move |index| Row { dataset: self, index })
    }
}

/// Borrowed view of one dataset row, addressed by column name
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<Value<'a>> {
        let col = self.dataset.column(column)?;
        Some(match &col.values {
            ColumnValues::Numeric(v) => Value::Number(v[self.index]),
            ColumnValues::Categorical(v) => Value::Category(v[self.index].as_str()),
            ColumnValues::Unsupported { .. } => Value::Unsupported,
        })
    }

    /// Numeric value of `column`, `None` if absent or not numeric
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(|v| v.as_f64())
    }
}

/// Builder for [`Dataset`]
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    columns: Vec<Column>,
}

impl DatasetBuilder {
    /// Add a numeric column
    pub fn numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push(Column {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        });
        self
    }

    /// Add a categorical column
    pub fn categorical<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.columns.push(Column {
            name: name.into(),
            values: ColumnValues::Categorical(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Add a column of a type the pipeline cannot encode
    pub fn unsupported(mut self, name: impl Into<String>, dtype: impl Into<String>, len: usize) -> Self {
        self.columns.push(Column {
            name: name.into(),
            values: ColumnValues::Unsupported {
                dtype: dtype.into(),
                len,
            },
        });
        self
    }

    /// Add an already constructed column
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Finish the dataset; column lengths must agree and names be unique
    pub fn build(self) -> Result<Dataset> {
        let n_rows = self.columns.first().map(|c| c.values.len()).unwrap_or(0);

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(AnomalyError::InvalidDataset(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
            if col.values.len() != n_rows {
                return Err(AnomalyError::InvalidDataset(format!(
                    "column '{}' has {} values, expected {}",
                    col.name,
                    col.values.len(),
                    n_rows
                )));
            }
        }

        Ok(Dataset {
            columns: self.columns,
            n_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::builder()
            .numeric("cost", vec![10.0, 12.0, 11.0])
            .categorical("region", ["north", "south", "north"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_shape() {
        let ds = sample();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_columns(), 2);
        assert_eq!(ds.numeric_columns(), vec!["cost"]);
        assert_eq!(ds.categorical_columns(), vec!["region"]);
    }

    #[test]
    fn test_row_access() {
        let ds = sample();
        let row = ds.row(1).unwrap();
        assert_eq!(row.index(), 1);
        assert_eq!(row.number("cost"), Some(12.0));
        assert_eq!(row.get("region"), Some(Value::Category("south")));
        assert_eq!(row.get("missing"), None);
        assert!(ds.row(3).is_none());
        assert_eq!(ds.rows().count(), 3);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Dataset::builder()
            .numeric("a", vec![1.0, 2.0])
            .numeric("b", vec![1.0])
            .build();
        assert!(matches!(result, Err(AnomalyError::InvalidDataset(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Dataset::builder()
            .numeric("a", vec![1.0])
            .categorical("a", ["x"])
            .build();
        assert!(matches!(result, Err(AnomalyError::InvalidDataset(_))));
    }

    #[test]
    fn test_validate_reports_issues() {
        assert!(sample().validate().is_empty());

        let empty = Dataset::builder().numeric("a", vec![]).build().unwrap();
        assert_eq!(empty.validate(), vec!["Dataset is empty".to_string()]);

        let odd = Dataset::builder().unsupported("when", "date", 2).build().unwrap();
        let issues = odd.validate();
        assert!(issues.iter().any(|i| i.contains("No numeric or categorical")));
        assert!(issues.iter().any(|i| i.contains("'when'")));
    }

    #[test]
    fn test_inspect_groups_columns() {
        let ds = Dataset::builder()
            .numeric("cost", vec![1.0])
            .unsupported("when", "date", 1)
            .categorical("region", ["x"])
            .build()
            .unwrap();
        let summary = ds.inspect();
        assert_eq!(summary.numeric, vec!["cost"]);
        assert_eq!(summary.categorical, vec!["region"]);
        assert_eq!(summary.unsupported, vec!["when"]);
    }
}
