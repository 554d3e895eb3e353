//! Reconstruction-error anomaly scoring
//!
//! A one-hidden-layer dense autoencoder (tanh bottleneck, linear output)
//! trained with mini-batch SGD and momentum on the mean squared
//! reconstruction error. Rows the network reconstructs poorly score high.

use crate::anomaly::{AnomalyScorer, ScoreRecord, DEFAULT_SEED};
use crate::error::{AnomalyError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MOMENTUM: f64 = 0.9;

/// Training hyperparameters for [`Autoencoder`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoencoderParams {
    /// Passes over the training rows
    pub epochs: usize,
    /// Rows per gradient step
    pub batch_size: usize,
    /// Bottleneck width; `None` means half the input width, at least 1
    pub hidden_size: Option<usize>,
    /// SGD step size
    pub learning_rate: f64,
}

impl Default for AutoencoderParams {
    fn default() -> Self {
        Self {
            epochs: 30,
            batch_size: 32,
            hidden_size: None,
            learning_rate: 0.01,
        }
    }
}

impl AutoencoderParams {
    /// Check hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.epochs < 1 {
            return Err(AnomalyError::config("epochs", self.epochs, "must be at least 1"));
        }
        if self.batch_size < 1 {
            return Err(AnomalyError::config("batch_size", self.batch_size, "must be at least 1"));
        }
        if let Some(h) = self.hidden_size {
            if h < 1 {
                return Err(AnomalyError::config("hidden_size", h, "must be at least 1"));
            }
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(AnomalyError::config(
                "learning_rate",
                self.learning_rate,
                "must be a finite, positive number",
            ));
        }
        Ok(())
    }

    fn bottleneck(&self, n_features: usize) -> usize {
        self.hidden_size.unwrap_or((n_features / 2).max(1))
    }
}

/// Fully connected layer, `y = x·W + b`
#[derive(Debug, Clone)]
pub struct DenseLayer {
    /// Weights, `input_dim × output_dim`
    weights: Array2<f64>,
    /// Bias per output unit
    bias: Array1<f64>,
}

impl DenseLayer {
    /// Glorot-uniform weights drawn from `rng`, zero bias
    pub fn new(input_dim: usize, output_dim: usize, rng: &mut impl Rng) -> Self {
        let scale = (2.0 / (input_dim + output_dim) as f64).sqrt();
        let weights = Array2::from_shape_fn((input_dim, output_dim), |_| {
            rng.gen::<f64>() * 2.0 * scale - scale
        });

        Self {
            weights,
            bias: Array1::zeros(output_dim),
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn input_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.ncols()
    }

    fn zero_grad(&self) -> LayerGrad {
        LayerGrad {
            weights: Array2::zeros(self.weights.raw_dim()),
            bias: Array1::zeros(self.bias.len()),
        }
    }

    /// Momentum step: `v = μv - ηg`, then `θ += v`
    fn apply(&mut self, grad: &LayerGrad, velocity: &mut LayerGrad, learning_rate: f64) {
        velocity.weights = &velocity.weights * MOMENTUM - &grad.weights * learning_rate;
        velocity.bias = &velocity.bias * MOMENTUM - &grad.bias * learning_rate;
        self.weights += &velocity.weights;
        self.bias += &velocity.bias;
    }
}

#[derive(Debug, Clone)]
struct LayerGrad {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

#[derive(Debug, Clone)]
struct Network {
    encoder: DenseLayer,
    decoder: DenseLayer,
}

impl Network {
    fn new(n_features: usize, hidden: usize, rng: &mut impl Rng) -> Self {
        Self {
            encoder: DenseLayer::new(n_features, hidden, rng),
            decoder: DenseLayer::new(hidden, n_features, rng),
        }
    }

    fn reconstruct(&self, x: &Array2<f64>) -> Array2<f64> {
        let hidden = self.encoder.forward(x).mapv(f64::tanh);
        self.decoder.forward(&hidden)
    }

    /// Mean squared error per row
    fn reconstruction_errors(&self, x: &Array2<f64>) -> Array1<f64> {
        let residual = self.reconstruct(x) - x;
        residual.mapv(|r| r * r).sum_axis(Axis(1)) / x.ncols() as f64
    }

    /// Gradients of the batch MSE and the batch loss
    fn backward(&self, batch: &Array2<f64>) -> (LayerGrad, LayerGrad, f64) {
        let m = batch.nrows() as f64;
        let hidden = self.encoder.forward(batch).mapv(f64::tanh);
        let output = self.decoder.forward(&hidden);

        let residual = output - batch;
        let loss = residual.mapv(|r| r * r).sum() / (m * batch.ncols() as f64);

        let delta_out = residual / m;
        let decoder_grad = LayerGrad {
            weights: hidden.t().dot(&delta_out),
            bias: delta_out.sum_axis(Axis(0)),
        };

        let delta_hidden = delta_out.dot(&self.decoder.weights.t()) * hidden.mapv(|a| 1.0 - a * a);
        let encoder_grad = LayerGrad {
            weights: batch.t().dot(&delta_hidden),
            bias: delta_hidden.sum_axis(Axis(0)),
        };

        (encoder_grad, decoder_grad, loss)
    }
}

/// Map a reconstruction error onto [0.5, 1) relative to the mean training error
fn reconstruction_score(error: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        1.0 - 0.5 * (-error / baseline).exp()
    } else {
        0.5
    }
}

/// Autoencoder anomaly detector
#[derive(Debug, Clone)]
pub struct Autoencoder {
    /// Training hyperparameters
    params: AutoencoderParams,
    /// Fraction of rows to flag
    contamination: f64,
    /// Seed for weight initialization and batch shuffling
    seed: u64,
    /// Trained encoder/decoder pair
    network: Option<Network>,
    /// Mean reconstruction error over the training rows
    baseline_error: Option<f64>,
    /// Mean training loss per epoch
    loss_history: Vec<f64>,
}

impl Autoencoder {
    pub fn new() -> Self {
        Self {
            params: AutoencoderParams::default(),
            contamination: 0.05,
            seed: DEFAULT_SEED,
            network: None,
            baseline_error: None,
            loss_history: Vec::new(),
        }
    }

    /// Set training hyperparameters
    pub fn with_params(mut self, params: AutoencoderParams) -> Self {
        self.params = params;
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

    /// Check hyperparameters
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if !(self.contamination > 0.0 && self.contamination <= 1.0) {
            return Err(AnomalyError::config(
                "contamination_rate",
                self.contamination,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> &AutoencoderParams {
        &self.params
    }

    /// Mean training loss of each epoch of the last fit
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    /// Bottleneck width of the fitted network
    pub fn hidden_size(&self) -> Option<usize> {
        self.network.as_ref().map(|n| n.encoder.output_dim())
    }

    /// Per-row mean squared reconstruction error
    pub fn reconstruction_errors(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let network = self.network.as_ref().ok_or(AnomalyError::ModelNotFitted)?;
        let n_features = network.encoder.input_dim();
        if x.ncols() != n_features {
            return Err(AnomalyError::Shape {
                expected: format!("{} columns", n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(network.reconstruction_errors(x))
    }
}

impl Default for Autoencoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for Autoencoder {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 || n_features == 0 {
            return Err(AnomalyError::InvalidDataset(format!(
                "cannot fit on a {}x{} matrix",
                n_samples, n_features
            )));
        }

        let hidden = self.params.bottleneck(n_features);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut network = Network::new(n_features, hidden, &mut rng);
        let mut encoder_velocity = network.encoder.zero_grad();
        let mut decoder_velocity = network.decoder.zero_grad();

        let mut loss_history = Vec::with_capacity(self.params.epochs);
        for _epoch in 0..self.params.epochs {
            let mut indices: Vec<usize> = (0..n_samples).collect();
            indices.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            for batch_indices in indices.chunks(self.params.batch_size) {
                let batch = x.select(Axis(0), batch_indices);
                let (encoder_grad, decoder_grad, loss) = network.backward(&batch);

                network
                    .encoder
                    .apply(&encoder_grad, &mut encoder_velocity, self.params.learning_rate);
                network
                    .decoder
                    .apply(&decoder_grad, &mut decoder_velocity, self.params.learning_rate);
                epoch_loss += loss * batch_indices.len() as f64;
            }
            loss_history.push(epoch_loss / n_samples as f64);
        }

        let errors = network.reconstruction_errors(x);
        if errors.iter().any(|e| !e.is_finite()) {
            return Err(AnomalyError::Data(
                "autoencoder training diverged; lower the learning rate".to_string(),
            ));
        }
        let baseline = errors.sum() / n_samples as f64;

        debug!(
            epochs = self.params.epochs,
            batch_size = self.params.batch_size,
            hidden,
            final_loss = loss_history.last().copied().unwrap_or(0.0),
            baseline_error = baseline,
            "Fitted autoencoder"
        );

        self.network = Some(network);
        self.baseline_error = Some(baseline);
        self.loss_history = loss_history;
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let baseline = self.baseline_error.ok_or(AnomalyError::ModelNotFitted)?;
        let errors = self.reconstruction_errors(x)?;
        Ok(errors.mapv(|e| reconstruction_score(e, baseline)))
    }

    fn contamination(&self) -> f64 {
        self.contamination
    }
}

/// Train an autoencoder on `matrix` and score and flag every row
pub fn fit_score_autoencoder(
    matrix: &Array2<f64>,
    params: AutoencoderParams,
    contamination_rate: f64,
    seed: u64,
) -> Result<Vec<ScoreRecord>> {
    Autoencoder::new()
        .with_params(params)
        .with_contamination(contamination_rate)
        .with_seed(seed)
        .fit_score(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 40 standardized-looking rows in a tight band plus one far row
    fn band_with_outlier() -> Array2<f64> {
        let mut data = Vec::new();
        for i in 0..40 {
            let t = (i % 8) as f64 * 0.1;
            data.push(t);
            data.push(if i % 2 == 0 { 1.0 } else { 0.0 });
            data.push(if i % 2 == 0 { 0.0 } else { 1.0 });
        }
        data[3 * 29] = 9.0;
        Array2::from_shape_vec((40, 3), data).unwrap()
    }

    #[test]
    fn test_autoencoder_flags_far_row() {
        let x = band_with_outlier();
        let records = Autoencoder::new()
            .with_contamination(1.0 / 40.0)
            .fit_score(&x)
            .unwrap();

        let flagged: Vec<usize> = records.iter().filter(|r| r.is_anomaly).map(|r| r.index).collect();
        assert_eq!(flagged, vec![29]);
    }

    #[test]
    fn test_loss_decreases() {
        let mut ae = Autoencoder::new();
        ae.fit(&band_with_outlier()).unwrap();

        let history = ae.loss_history();
        assert_eq!(history.len(), 30);
        assert!(history.last().unwrap() < history.first().unwrap());
    }

    #[test]
    fn test_default_bottleneck() {
        let mut ae = Autoencoder::new();
        ae.fit(&band_with_outlier()).unwrap();
        assert_eq!(ae.hidden_size(), Some(1));

        let wide = Array2::from_shape_fn((20, 6), |(i, j)| ((i * 3 + j) % 5) as f64);
        ae.fit(&wide).unwrap();
        assert_eq!(ae.hidden_size(), Some(3));
    }

    #[test]
    fn test_scores_bounded() {
        let x = band_with_outlier();
        let mut ae = Autoencoder::new();
        ae.fit(&x).unwrap();

        let scores = ae.score_samples(&x).unwrap();
        assert!(scores.iter().all(|&s| s >= 0.5 && s <= 1.0));
    }

    #[test]
    fn test_same_seed_same_scores() {
        let x = band_with_outlier();
        let a = fit_score_autoencoder(&x, AutoencoderParams::default(), 0.05, 3).unwrap();
        let b = fit_score_autoencoder(&x, AutoencoderParams::default(), 0.05, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reconstruction_score_mapping() {
        assert_eq!(reconstruction_score(0.0, 1.0), 0.5);
        assert_eq!(reconstruction_score(3.0, 0.0), 0.5);
        assert!(reconstruction_score(2.0, 1.0) > reconstruction_score(1.0, 1.0));
    }

    #[test]
    fn test_invalid_params() {
        let x = band_with_outlier();
        let bad = [
            AutoencoderParams { epochs: 0, ..Default::default() },
            AutoencoderParams { batch_size: 0, ..Default::default() },
            AutoencoderParams { hidden_size: Some(0), ..Default::default() },
            AutoencoderParams { learning_rate: 0.0, ..Default::default() },
            AutoencoderParams { learning_rate: f64::NAN, ..Default::default() },
        ];
        for params in bad {
            let result = Autoencoder::new().with_params(params).fit(&x);
            assert!(matches!(result, Err(AnomalyError::InvalidConfig { .. })));
        }
    }

    #[test]
    fn test_score_before_fit() {
        let ae = Autoencoder::new();
        assert!(matches!(
            ae.score_samples(&band_with_outlier()),
            Err(AnomalyError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut ae = Autoencoder::new();
        ae.fit(&band_with_outlier()).unwrap();
        let narrow = Array2::zeros((4, 2));
        assert!(matches!(ae.score_samples(&narrow), Err(AnomalyError::Shape { .. })));
    }
}
