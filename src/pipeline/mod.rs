//! Detection pipeline
//!
//! Wires the stages together for one run:
//! dataset → feature encoding → ensemble scoring → deviation explanations.
//! A run either returns a complete [`AnomalyReport`] or fails as a whole.

mod config;

pub use config::{PipelineConfig, RunSettings};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::explainability::{explain, ReferenceStats, NORMAL_LABEL};
use crate::preprocessing::encode;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Outcome for one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    /// Position of the row in the input dataset
    pub index: usize,
    /// Whether the row falls in the flagged top fraction
    pub is_anomaly: bool,
    /// Anomaly score in (0, 1]
    pub score: f64,
    /// Deviation explanation for flagged rows, the normal label otherwise
    pub explanation: String,
}

/// Per-row results in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// One result per input row, in input order
    pub rows: Vec<RowResult>,
    /// Settings the report was produced with
    pub settings: RunSettings,
    /// Width of the encoded feature matrix
    pub n_features: usize,
}

impl AnomalyReport {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_anomalies(&self) -> usize {
        self.rows.iter().filter(|r| r.is_anomaly).count()
    }

    /// Fraction of rows flagged
    pub fn anomaly_rate(&self) -> f64 {
        if self.rows.is_empty() {
            0.0
        } else {
            self.n_anomalies() as f64 / self.rows.len() as f64
        }
    }

    /// Flagged rows by descending score, ties by index
    pub fn anomalies(&self) -> Vec<&RowResult> {
        let mut flagged: Vec<&RowResult> = self.rows.iter().filter(|r| r.is_anomaly).collect();
        flagged.sort_by(|a, b| b.score.total_cmp(&a.score));
        flagged
    }

    pub fn scores(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.score).collect()
    }
}

/// Stateless detection pipeline
#[derive(Debug, Clone, Default)]
pub struct AnomalyPipeline {
    config: PipelineConfig,
}

impl AnomalyPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Score and explain every row of `dataset`
    pub fn run(&self, dataset: &Dataset) -> Result<AnomalyReport> {
        let start = Instant::now();
        self.config.validate()?;

        let (matrix, layout) = encode(dataset)?;
        let records = self
            .config
            .method
            .fit_score(&matrix, &self.config.scoring_params())?;
        debug!(
            method = self.config.method.name(),
            rows = records.len(),
            "Scored rows"
        );

        let reference_stats = ReferenceStats::from_dataset(dataset);
        let numeric_columns = layout.numeric_columns();

        let rows: Vec<RowResult> = records
            .iter()
            .zip(dataset.rows())
            .map(|(record, row)| {
                let explanation = if record.is_anomaly {
                    explain(&row, &reference_stats, &numeric_columns, self.config.z_threshold)
                } else {
                    NORMAL_LABEL.to_string()
                };
                RowResult {
                    index: record.index,
                    is_anomaly: record.is_anomaly,
                    score: record.score,
                    explanation,
                }
            })
            .collect();

        let report = AnomalyReport {
            rows,
            settings: self.config.settings(),
            n_features: layout.n_features(),
        };

        info!(
            rows = report.len(),
            anomalies = report.n_anomalies(),
            features = report.n_features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Anomaly detection finished"
        );

        Ok(report)
    }
}

/// Run the pipeline once with `config`
pub fn run(dataset: &Dataset, config: &PipelineConfig) -> Result<AnomalyReport> {
    AnomalyPipeline::new(config.clone()).run(dataset)
}
