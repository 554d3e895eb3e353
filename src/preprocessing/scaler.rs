//! Standard (z-score) scaling of numeric columns

use serde::{Deserialize, Serialize};

/// Fitted standardization parameters for one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column mean
    pub mean: f64,
    /// Population standard deviation (ddof = 0); exactly 0 for constant columns
    pub std: f64,
}

impl StandardScaler {
    /// Fit mean and population std over `values`
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let first = values[0];
        if values.iter().all(|&v| v == first) {
            // Constant column: keep std at exactly zero instead of rounding noise.
            return Self { mean, std: 0.0 };
        }

        let var = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
        Self { mean, std: var.sqrt() }
    }

    /// Scale one value; zero-variance columns scale to 0
    #[inline]
    pub fn scale(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            0.0
        } else {
            (value - self.mean) / self.std
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let scaler = StandardScaler::fit(&values);
        assert!((scaler.mean - 3.0).abs() < 1e-12);
        assert!((scaler.std - 2.0f64.sqrt()).abs() < 1e-12);

        let scaled: Vec<f64> = values.iter().map(|&v| scaler.scale(v)).collect();
        let mean = scaled.iter().sum::<f64>() / scaled.len() as f64;
        assert!(mean.abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let scaler = StandardScaler::fit(&[0.1, 0.1, 0.1]);
        assert_eq!(scaler.std, 0.0);
        assert_eq!(scaler.scale(0.1), 0.0);
        assert_eq!(scaler.scale(42.0), 0.0);
    }
}
