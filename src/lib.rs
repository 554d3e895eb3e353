//! Explainable anomaly detection for tabular data
//!
//! This crate scores every row of a dataset for anomalousness without labels
//! and explains each flagged row in terms of the features that drove it:
//! - Feature encoding (standardization, one-hot encoding)
//! - Isolation Forest scoring with reproducible per-tree random streams
//! - Autoencoder scoring by reconstruction error, seeded the same way
//! - Univariate z-score explanations for flagged rows
//!
//! # Modules
//!
//! - [`dataset`] - Typed tabular dataset, polars/CSV adapter
//! - [`preprocessing`] - Feature encoder and frozen feature layout
//! - [`anomaly`] - Scoring strategies (Isolation Forest, Autoencoder)
//! - [`explainability`] - Deviation explainer
//! - [`pipeline`] - Configuration and the end-to-end run
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use explainable_anomaly::prelude::*;
//!
//! let dataset = Dataset::read_csv("costs.csv")?;
//! let report = run(&dataset, &PipelineConfig::default())?;
//! for row in report.anomalies() {
//!     println!("{} {:.3} {}", row.index, row.score, row.explanation);
//! }
//! # Ok::<(), explainable_anomaly::AnomalyError>(())
//! ```

// Core error handling
pub mod error;

// Data model and encoding
pub mod dataset;
pub mod preprocessing;

// Scoring and explanation
pub mod anomaly;
pub mod explainability;

// Orchestration
pub mod pipeline;

// Services
pub mod cli;

pub use error::{AnomalyError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::anomaly::{
        AnomalyScorer, Autoencoder, AutoencoderParams, IsolationForest, ScoreRecord, ScoringMethod,
    };
    pub use crate::dataset::{ColumnKind, Dataset, Row, Value};
    pub use crate::error::{AnomalyError, Result};
    pub use crate::explainability::{explain, Explanation, ReferenceStats};
    pub use crate::pipeline::{
        run, AnomalyPipeline, AnomalyReport, PipelineConfig, RowResult, RunSettings,
    };
    pub use crate::preprocessing::{encode, FeatureLayout, NumericMatrix};
}
