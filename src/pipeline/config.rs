//! Pipeline configuration

use crate::anomaly::{AutoencoderParams, ScoringMethod, ScoringParams, DEFAULT_SEED};
use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scoring strategy
    pub method: ScoringMethod,

    /// Fraction of rows flagged, by descending score
    pub contamination_rate: f64,

    /// Number of trees in the ensemble
    pub ensemble_size: usize,

    /// Rows drawn per tree; `None` means `min(256, row_count)`
    pub subsample_size: Option<usize>,

    /// Training hyperparameters for the autoencoder strategy
    pub autoencoder: AutoencoderParams,

    /// Minimum |z| for a feature to appear in an explanation
    pub z_threshold: f64,

    /// Base seed for the per-tree random streams
    pub seed: u64,

    /// Build and score trees on the rayon thread pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            method: ScoringMethod::IsolationForest,
            contamination_rate: 0.05,
            ensemble_size: 100,
            subsample_size: None,
            autoencoder: AutoencoderParams::default(),
            z_threshold: 2.5,
            seed: DEFAULT_SEED,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the scoring strategy
    pub fn with_method(mut self, method: ScoringMethod) -> Self {
        self.method = method;
        self
    }

    /// Builder method to set the contamination rate
    pub fn with_contamination_rate(mut self, rate: f64) -> Self {
        self.contamination_rate = rate;
        self
    }

    /// Builder method to set the number of trees
    pub fn with_ensemble_size(mut self, n: usize) -> Self {
        self.ensemble_size = n;
        self
    }

    /// Builder method to set rows per tree
    pub fn with_subsample_size(mut self, n: usize) -> Self {
        self.subsample_size = Some(n);
        self
    }

    /// Builder method to set the autoencoder hyperparameters
    pub fn with_autoencoder(mut self, params: AutoencoderParams) -> Self {
        self.autoencoder = params;
        self
    }

    /// Builder method to set the explanation threshold
    pub fn with_z_threshold(mut self, z: f64) -> Self {
        self.z_threshold = z;
        self
    }

    /// Builder method to set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to toggle parallel execution
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load a JSON configuration document; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check every field before any work is done
    pub fn validate(&self) -> Result<()> {
        if self.ensemble_size < 1 {
            return Err(AnomalyError::config(
                "ensemble_size",
                self.ensemble_size,
                "must be at least 1",
            ));
        }
        if let Some(n) = self.subsample_size {
            if n < 2 {
                return Err(AnomalyError::config("subsample_size", n, "must be at least 2"));
            }
        }
        if !(self.contamination_rate > 0.0 && self.contamination_rate <= 1.0) {
            return Err(AnomalyError::config(
                "contamination_rate",
                self.contamination_rate,
                "must be in (0, 1]",
            ));
        }
        if !self.z_threshold.is_finite() || self.z_threshold < 0.0 {
            return Err(AnomalyError::config(
                "z_threshold",
                self.z_threshold,
                "must be a finite, non-negative number",
            ));
        }
        self.autoencoder.validate()
    }

    /// Parameters for the scoring stage
    pub fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            ensemble_size: self.ensemble_size,
            subsample_size: self.subsample_size,
            autoencoder: self.autoencoder,
            contamination_rate: self.contamination_rate,
            seed: self.seed,
            parallel: self.parallel,
        }
    }

    /// The fields that determine a run's output, without execution options
    pub fn settings(&self) -> RunSettings {
        RunSettings {
            method: self.method,
            contamination_rate: self.contamination_rate,
            ensemble_size: self.ensemble_size,
            subsample_size: self.subsample_size,
            autoencoder: self.autoencoder,
            z_threshold: self.z_threshold,
            seed: self.seed,
        }
    }
}

/// Settings recorded in a report.
///
/// Identical settings and input give an identical report, whether trees
/// were built sequentially or on the thread pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Scoring strategy
    pub method: ScoringMethod,
    /// Fraction of rows flagged
    pub contamination_rate: f64,
    /// Number of trees in the ensemble
    pub ensemble_size: usize,
    /// Rows drawn per tree, if set explicitly
    pub subsample_size: Option<usize>,
    /// Autoencoder training hyperparameters
    pub autoencoder: AutoencoderParams,
    /// Minimum |z| cited in explanations
    pub z_threshold: f64,
    /// Base seed
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.contamination_rate, 0.05);
        assert_eq!(config.ensemble_size, 100);
        assert_eq!(config.subsample_size, None);
        assert_eq!(config.z_threshold, 2.5);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_contamination_rate(0.1)
            .with_ensemble_size(50)
            .with_subsample_size(64)
            .with_z_threshold(3.0)
            .with_seed(7)
            .with_parallel(false);

        assert_eq!(config.contamination_rate, 0.1);
        assert_eq!(config.ensemble_size, 50);
        assert_eq!(config.subsample_size, Some(64));
        assert_eq!(config.z_threshold, 3.0);
        assert_eq!(config.seed, 7);
        assert!(!config.parallel);
    }

    #[test]
    fn test_validation_errors() {
        let bad = [
            PipelineConfig::new().with_ensemble_size(0),
            PipelineConfig::new().with_subsample_size(1),
            PipelineConfig::new().with_contamination_rate(0.0),
            PipelineConfig::new().with_contamination_rate(1.01),
            PipelineConfig::new().with_z_threshold(f64::NAN),
            PipelineConfig::new().with_z_threshold(-1.0),
            PipelineConfig::new().with_autoencoder(AutoencoderParams {
                epochs: 0,
                ..Default::default()
            }),
            PipelineConfig::new().with_autoencoder(AutoencoderParams {
                batch_size: 0,
                ..Default::default()
            }),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(AnomalyError::InvalidConfig { .. })));
        }
        assert!(PipelineConfig::new().with_contamination_rate(1.0).validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = PipelineConfig::from_json_str(
            r#"{"contamination_rate": 0.1, "seed": 5, "method": "isolation_forest"}"#,
        )
        .unwrap();
        assert_eq!(config.contamination_rate, 0.1);
        assert_eq!(config.seed, 5);
        assert_eq!(config.ensemble_size, 100);
    }

    #[test]
    fn test_from_json_autoencoder() {
        let config = PipelineConfig::from_json_str(
            r#"{"method": "autoencoder", "autoencoder": {"epochs": 50, "batch_size": 16}}"#,
        )
        .unwrap();
        assert_eq!(config.method, ScoringMethod::Autoencoder);
        assert_eq!(config.autoencoder.epochs, 50);
        assert_eq!(config.autoencoder.batch_size, 16);
        assert_eq!(config.autoencoder.learning_rate, 0.01);
    }

    #[test]
    fn test_settings_exclude_execution_mode() {
        let base = PipelineConfig::new().with_seed(7);
        let seq = base.clone().with_parallel(false).settings();
        let par = base.with_parallel(true).settings();
        assert_eq!(seq, par);

        let json = serde_json::to_string(&seq).unwrap();
        assert!(!json.contains("parallel"));
        assert!(json.contains("\"seed\":7"));
    }

    #[test]
    fn test_from_json_invalid() {
        let result = PipelineConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(AnomalyError::Serialization(_))));
    }
}
