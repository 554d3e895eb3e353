//! Anomaly scoring module
//!
//! Scores every row of an encoded matrix and flags the top
//! `contamination_rate` fraction. Strategies form a closed set selected
//! through [`ScoringMethod`]; each one implements [`AnomalyScorer`].

mod autoencoder;
mod isolation_forest;

pub use autoencoder::{fit_score_autoencoder, Autoencoder, AutoencoderParams, DenseLayer};
pub use isolation_forest::{average_path_length, fit_score, IsolationForest, IsolationTree, DEFAULT_SEED};

use crate::error::{AnomalyError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-row scoring outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Row position in the scored matrix
    pub index: usize,
    /// Anomaly score in (0, 1], higher = more anomalous
    pub score: f64,
    /// Whether the row falls in the flagged top fraction
    pub is_anomaly: bool,
}

/// Trait for anomaly scorers
pub trait AnomalyScorer: Send + Sync {
    /// Fit the scorer on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Compute anomaly scores (higher = more anomalous)
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Fraction of rows to flag
    fn contamination(&self) -> f64;

    /// Fit on `x`, then score and flag every row of `x`
    fn fit_score(&mut self, x: &Array2<f64>) -> Result<Vec<ScoreRecord>> {
        self.fit(x)?;
        let scores = self.score_samples(x)?.to_vec();
        let flags = flag_top_fraction(&scores, self.contamination());

        Ok(scores
            .iter()
            .zip(flags)
            .enumerate()
            .map(|(index, (&score, is_anomaly))| ScoreRecord {
                index,
                score,
                is_anomaly,
            })
            .collect())
    }
}

/// Flag the `round(rate * n)` highest scores.
///
/// Rows are ranked by descending score; equal scores keep row order, so the
/// lower index wins at the cutoff.
pub fn flag_top_fraction(scores: &[f64], rate: f64) -> Vec<bool> {
    let n = scores.len();
    let n_flag = ((rate * n as f64).round().max(0.0) as usize).min(n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut flags = vec![false; n];
    for &i in order.iter().take(n_flag) {
        flags[i] = true;
    }
    flags
}

/// Parameters handed to whichever scoring strategy is selected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Number of trees in the isolation ensemble
    pub ensemble_size: usize,
    /// Rows per tree; `None` means `min(256, row_count)`
    pub subsample_size: Option<usize>,
    /// Autoencoder training hyperparameters
    pub autoencoder: AutoencoderParams,
    /// Fraction of rows flagged, by descending score
    pub contamination_rate: f64,
    /// Base seed for every random stream of the run
    pub seed: u64,
    /// Build and score trees on the rayon thread pool
    pub parallel: bool,
}

/// Available scoring strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Random-partitioning ensemble (isolation forest)
    #[default]
    IsolationForest,
    /// Dense autoencoder scored by reconstruction error
    Autoencoder,
}

impl ScoringMethod {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ScoringMethod::IsolationForest => "Isolation Forest",
            ScoringMethod::Autoencoder => "Autoencoder",
        }
    }

    /// Fit this strategy on `matrix` and score every row
    pub fn fit_score(&self, matrix: &Array2<f64>, params: &ScoringParams) -> Result<Vec<ScoreRecord>> {
        match self {
            ScoringMethod::IsolationForest => {
                let mut forest = IsolationForest::new()
                    .with_n_estimators(params.ensemble_size)
                    .with_max_samples(params.subsample_size.unwrap_or(256))
                    .with_contamination(params.contamination_rate)
                    .with_seed(params.seed)
                    .with_parallel(params.parallel);
                forest.fit_score(matrix)
            }
            ScoringMethod::Autoencoder => {
                let mut autoencoder = Autoencoder::new()
                    .with_params(params.autoencoder)
                    .with_contamination(params.contamination_rate)
                    .with_seed(params.seed);
                autoencoder.fit_score(matrix)
            }
        }
    }
}

impl FromStr for ScoringMethod {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "isolation_forest" | "iforest" => Ok(ScoringMethod::IsolationForest),
            "autoencoder" => Ok(ScoringMethod::Autoencoder),
            _ => Err(AnomalyError::config(
                "method",
                s,
                "expected isolation_forest or autoencoder",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_top_fraction() {
        let scores = [0.4, 0.9, 0.5, 0.8, 0.3];
        assert_eq!(
            flag_top_fraction(&scores, 0.4),
            vec![false, true, false, true, false]
        );
    }

    #[test]
    fn test_flag_ties_prefer_lower_index() {
        let scores = [0.7, 0.7, 0.7, 0.1];
        assert_eq!(flag_top_fraction(&scores, 0.5), vec![true, true, false, false]);
    }

    #[test]
    fn test_flag_rounding() {
        let scores = vec![0.5; 10];
        assert_eq!(flag_top_fraction(&scores, 0.04).iter().filter(|&&f| f).count(), 0);
        assert_eq!(flag_top_fraction(&scores, 0.05).iter().filter(|&&f| f).count(), 1);
        assert_eq!(flag_top_fraction(&scores, 1.0).iter().filter(|&&f| f).count(), 10);
    }

    #[test]
    fn test_flag_monotone_in_rate() {
        let scores: Vec<f64> = (0..37).map(|i| ((i * 7) % 11) as f64 / 11.0).collect();
        let mut last = 0;
        for step in 1..=20 {
            let count = flag_top_fraction(&scores, step as f64 * 0.05)
                .iter()
                .filter(|&&f| f)
                .count();
            assert!(count >= last);
            last = count;
        }
    }

    #[test]
    fn test_scoring_method_serde() {
        let json = serde_json::to_string(&ScoringMethod::IsolationForest).unwrap();
        assert_eq!(json, "\"isolation_forest\"");
        assert_eq!(ScoringMethod::default().name(), "Isolation Forest");

        let method: ScoringMethod = serde_json::from_str("\"autoencoder\"").unwrap();
        assert_eq!(method, ScoringMethod::Autoencoder);
    }

    #[test]
    fn test_scoring_method_from_str() {
        assert_eq!("Isolation Forest".parse::<ScoringMethod>().unwrap(), ScoringMethod::IsolationForest);
        assert_eq!("isolation-forest".parse::<ScoringMethod>().unwrap(), ScoringMethod::IsolationForest);
        assert_eq!("autoencoder".parse::<ScoringMethod>().unwrap(), ScoringMethod::Autoencoder);
        assert!(matches!(
            "kmeans".parse::<ScoringMethod>(),
            Err(AnomalyError::InvalidConfig { .. })
        ));
    }
}
