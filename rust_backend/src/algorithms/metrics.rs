//! Forecast accuracy metrics
//!
//! Standard regression metrics over paired actual and predicted values.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// Mean Absolute Error (MAE)
///
/// Average of absolute differences between predictions and actual values.
/// Returns NaN for empty or mismatched inputs.
///
/// # Example
///
/// ```rust
/// use airpax_forecast::algorithms::metrics::mae;
///
/// let actual = vec![10.0, 20.0, 30.0];
/// let predicted = vec![12.0, 18.0, 30.0];
/// assert!((mae(&actual, &predicted) - 4.0 / 3.0).abs() < 1e-12);
/// ```
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();

    sum / actual.len() as f64
}

/// Mean Squared Error (MSE)
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    sum / actual.len() as f64
}

/// Root Mean Squared Error (RMSE)
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Coefficient of determination (R²)
///
/// `1 - SS_res / SS_tot`. When every actual value is identical `SS_tot` is
/// zero; the score is then 1.0 for a perfect prediction and 0.0 otherwise.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// `actual - predicted` for each pair.
pub fn residuals(actual: &[f64], predicted: &[f64]) -> Vec<f64> {
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| a - p)
        .collect()
}

/// The three headline scores of a test-set evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute MAE, RMSE and R² over a non-empty set of pairs.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> ForecastResult<Self> {
        if actual.is_empty() {
            return Err(ForecastError::InsufficientData(
                "test set is empty; metrics are undefined".to_string(),
            ));
        }
        if actual.len() != predicted.len() {
            return Err(ForecastError::ConfigurationError(format!(
                "{} actual values but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }

        Ok(Self {
            mae: mae(actual, predicted),
            rmse: rmse(actual, predicted),
            r2: r2(actual, predicted),
        })
    }
}
