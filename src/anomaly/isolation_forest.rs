//! Isolation Forest anomaly detection

use crate::anomaly::{AnomalyScorer, ScoreRecord};
use crate::error::{AnomalyError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::distributions::Open01;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

const EULER_GAMMA: f64 = 0.5772156649;

/// Default seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Average path length of an unsuccessful BST search over `n` points.
///
/// c(n) = 2 * H(n-1) - 2(n-1)/n with H(i) ~ ln(i) + γ, and c(0) = c(1) = 0.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        let n_f = n as f64;
        2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
    }
}

/// Isolation Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values < threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values >= threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of subsample rows that reached this leaf
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree over the rows of `x` listed in `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if depth >= max_depth || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Only features that still vary inside this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min_val, max_val) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| {
                        let v = x[[i, feature]];
                        (lo.min(v), hi.max(v))
                    },
                );
                (min_val < max_val).then_some((feature, min_val, max_val))
            })
            .collect();

        if candidates.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let (feature, min_val, max_val) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = split_between(min_val, max_val, rng);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] < threshold);

        let left = Box::new(Self::build(x, &left_indices, depth + 1, max_depth, rng));
        let right = Box::new(Self::build(x, &right_indices, depth + 1, max_depth, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Edges from the root to the leaf reached by `sample`, plus c(leaf size)
    pub fn path_length(&self, sample: ArrayView1<'_, f64>) -> f64 {
        let mut node = self;
        let mut edges = 0usize;
        loop {
            match node {
                IsolationTree::External { size } => {
                    return edges as f64 + average_path_length(*size);
                }
                IsolationTree::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold { left } else { right };
                    edges += 1;
                }
            }
        }
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        match self {
            IsolationTree::External { .. } => 0,
            IsolationTree::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Total number of rows stored in the leaves
    pub fn n_samples(&self) -> usize {
        match self {
            IsolationTree::External { size } => *size,
            IsolationTree::Internal { left, right, .. } => left.n_samples() + right.n_samples(),
        }
    }
}

/// Uniform split value strictly inside `(min, max)`.
///
/// Falls back to the midpoint, then to `max`, when the range is too narrow
/// to hold a drawn value; both halves stay non-empty either way.
fn split_between(min: f64, max: f64, rng: &mut impl Rng) -> f64 {
    let u: f64 = rng.sample(Open01);
    let t = min + u * (max - min);
    if t > min && t < max {
        return t;
    }
    let mid = min + (max - min) / 2.0;
    if mid > min && mid < max {
        mid
    } else {
        max
    }
}

/// Convert an average path length into a score in (0, 1]
fn anomaly_score(avg_path_length: f64, c_n: f64) -> f64 {
    if c_n > 0.0 {
        2.0_f64.powf(-avg_path_length / c_n)
    } else {
        // A single-row subsample gives no basis for isolation.
        0.5
    }
}

/// Isolation Forest anomaly detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Maximum rows drawn per tree (without replacement)
    max_samples: usize,
    /// Fraction of rows to flag
    contamination: f64,
    /// Base seed; tree `i` draws from its own stream seeded with `seed + i`
    seed: u64,
    /// Build trees and score rows on the rayon pool
    parallel: bool,
    /// Fitted trees
    trees: Option<Vec<IsolationTree>>,
    /// Rows actually drawn per tree
    samples_per_tree: Option<usize>,
    /// Column count seen at fit time
    n_features: Option<usize>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: DEFAULT_SEED,
            parallel: true,
            trees: None,
            samples_per_tree: None,
            n_features: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n;
        self
    }

    /// Set contamination ratio
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Toggle parallel tree construction and scoring
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators < 1 {
            return Err(AnomalyError::config(
                "ensemble_size",
                self.n_estimators,
                "must be at least 1",
            ));
        }
        if self.max_samples < 2 {
            return Err(AnomalyError::config(
                "subsample_size",
                self.max_samples,
                "must be at least 2",
            ));
        }
        if !(self.contamination > 0.0 && self.contamination <= 1.0) {
            return Err(AnomalyError::config(
                "contamination_rate",
                self.contamination,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Fitted trees, if any
    pub fn trees(&self) -> Option<&[IsolationTree]> {
        self.trees.as_deref()
    }

    /// Rows drawn per tree during the last fit
    pub fn samples_per_tree(&self) -> Option<usize> {
        self.samples_per_tree
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 || x.ncols() == 0 {
            return Err(AnomalyError::InvalidDataset(format!(
                "cannot fit on a {}x{} matrix",
                n_samples,
                x.ncols()
            )));
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_depth = (samples_per_tree as f64).log2().ceil() as usize;
        let base_seed = self.seed;

        let build_tree = |tree_idx: usize| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
            let indices = index::sample(&mut rng, n_samples, samples_per_tree).into_vec();
            IsolationTree::build(x, &indices, 0, max_depth, &mut rng)
        };

        let trees: Vec<IsolationTree> = if self.parallel {
            (0..self.n_estimators).into_par_iter().map(build_tree).collect()
        } else {
            (0..self.n_estimators).map(build_tree).collect()
        };

        debug!(
            trees = trees.len(),
            samples_per_tree,
            max_depth,
            parallel = self.parallel,
            "Fitted isolation forest"
        );

        self.trees = Some(trees);
        self.samples_per_tree = Some(samples_per_tree);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(AnomalyError::ModelNotFitted)?;
        let n_features = self.n_features.unwrap_or(0);
        if x.ncols() != n_features {
            return Err(AnomalyError::Shape {
                expected: format!("{} columns", n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let c_n = average_path_length(self.samples_per_tree.unwrap_or(0));
        let n_trees = trees.len() as f64;

        let score_row = |i: usize| {
            let row = x.row(i);
            let avg_path_length = trees.iter().map(|tree| tree.path_length(row)).sum::<f64>() / n_trees;
            anomaly_score(avg_path_length, c_n)
        };

        let scores: Vec<f64> = if self.parallel {
            (0..x.nrows()).into_par_iter().map(score_row).collect()
        } else {
            (0..x.nrows()).map(score_row).collect()
        };

        Ok(Array1::from_vec(scores))
    }

    fn contamination(&self) -> f64 {
        self.contamination
    }
}

/// Fit a forest on `matrix` and score and flag every row
pub fn fit_score(
    matrix: &Array2<f64>,
    ensemble_size: usize,
    subsample_size: usize,
    contamination_rate: f64,
    seed: u64,
) -> Result<Vec<ScoreRecord>> {
    IsolationForest::new()
        .with_n_estimators(ensemble_size)
        .with_max_samples(subsample_size)
        .with_contamination(contamination_rate)
        .with_seed(seed)
        .fit_score(matrix)
}
