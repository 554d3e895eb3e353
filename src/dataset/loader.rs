//! Conversion from polars dataframes and CSV files

use super::{Column, ColumnValues, Dataset};
use crate::error::{AnomalyError, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

impl Dataset {
    /// Build a dataset from a polars dataframe.
    ///
    /// Integer and float columns become numeric, string and boolean columns
    /// become categorical and every other dtype is kept as unsupported.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut builder = Dataset::builder();

        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();
            let values = match series.dtype() {
                dtype if is_numeric_dtype(dtype) => numeric_values(&name, series)?,
                DataType::String | DataType::Boolean => categorical_values(series)?,
                other => ColumnValues::Unsupported {
                    dtype: other.to_string(),
                    len: series.len(),
                },
            };
            builder = builder.column(Column { name, values });
        }

        let dataset = builder.build()?;
        debug!(
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "Converted dataframe"
        );
        Ok(dataset)
    }

    /// Load a CSV file with a header row
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(1000))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        Self::from_dataframe(&df)
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn numeric_values(name: &str, series: &Series) -> Result<ColumnValues> {
    if series.null_count() > 0 {
        return Err(AnomalyError::InvalidDataset(format!(
            "numeric column '{}' contains {} missing values",
            name,
            series.null_count()
        )));
    }

    let cast = series.cast(&DataType::Float64)?;
    let values: Vec<f64> = cast.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect();
    Ok(ColumnValues::Numeric(values))
}

fn categorical_values(series: &Series) -> Result<ColumnValues> {
    let cast = series.cast(&DataType::String)?;
    let values: Vec<String> = cast
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();
    Ok(ColumnValues::Categorical(values))
}
