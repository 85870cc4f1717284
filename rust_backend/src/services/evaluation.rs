//! Test-set evaluation of a fitted forest.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::algorithms::forest::RandomForestRegressor;
use crate::algorithms::metrics::{residuals, RegressionMetrics};
use crate::error::{ForecastError, ForecastResult};

/// Importance of one named feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Predictions, residuals and scores for one test set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub predictions: Vec<f64>,
    /// `actual - predicted`, aligned with `predictions`.
    pub residuals: Vec<f64>,
    pub metrics: RegressionMetrics,
    /// In model feature order.
    pub feature_importances: Vec<FeatureImportance>,
}

impl Evaluation {
    /// Importances sorted from least to most important.
    pub fn ranked_importances(&self) -> Vec<FeatureImportance> {
        let mut ranked = self.feature_importances.clone();
        ranked.sort_by(|a, b| a.importance.total_cmp(&b.importance));
        ranked
    }
}

pub struct Evaluator;

impl Evaluator {
    /// Score `model` against held-out rows.
    ///
    /// `feature_names` must list the model's features in order. Fails with
    /// `InsufficientData` when the test set is empty.
    pub fn evaluate(
        model: &RandomForestRegressor,
        test_features: ArrayView2<'_, f64>,
        test_labels: ArrayView1<'_, f64>,
        feature_names: &[String],
    ) -> ForecastResult<Evaluation> {
        if test_features.nrows() == 0 {
            return Err(ForecastError::InsufficientData(
                "test set is empty; metrics are undefined".to_string(),
            ));
        }
        if feature_names.len() != model.n_features() {
            return Err(ForecastError::ConfigurationError(format!(
                "{} feature names for a model with {} features",
                feature_names.len(),
                model.n_features()
            )));
        }

        let predictions = model.predict(test_features)?.to_vec();
        let actual = test_labels.to_vec();
        let metrics = RegressionMetrics::compute(&actual, &predictions)?;

        let feature_importances = feature_names
            .iter()
            .zip(model.feature_importances())
            .map(|(name, importance)| FeatureImportance {
                feature: name.clone(),
                importance,
            })
            .collect();

        info!(
            rows = predictions.len(),
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "Evaluated model on test set"
        );

        Ok(Evaluation {
            residuals: residuals(&actual, &predictions),
            predictions,
            metrics,
            feature_importances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::forest::ForestParams;
    use ndarray::{array, Array1, Array2};

    fn fitted() -> RandomForestRegressor {
        let features = Array2::from_shape_fn((36, 2), |(i, j)| {
            if j == 0 {
                (i % 12 + 1) as f64
            } else {
                (i * 10) as f64
            }
        });
        let labels = Array1::from_shape_fn(36, |i| (i * 10 + 5) as f64);
        let params = ForestParams {
            n_estimators: 8,
            ..ForestParams::default()
        };
        RandomForestRegressor::fit(&params, features.view(), labels.view()).unwrap()
    }

    fn names() -> Vec<String> {
        vec!["month_num".to_string(), "passengers_lag1".to_string()]
    }

    #[test]
    fn test_evaluate_produces_aligned_outputs() {
        let model = fitted();
        let test_features = array![[1.0, 100.0], [2.0, 200.0], [3.0, 300.0]];
        let test_labels = array![105.0, 205.0, 305.0];

        let evaluation =
            Evaluator::evaluate(&model, test_features.view(), test_labels.view(), &names()).unwrap();

        assert_eq!(evaluation.predictions.len(), 3);
        assert_eq!(evaluation.residuals.len(), 3);
        for i in 0..3 {
            assert!(
                (evaluation.residuals[i] - (test_labels[i] - evaluation.predictions[i])).abs()
                    < 1e-9
            );
        }
        assert!(evaluation.metrics.rmse >= evaluation.metrics.mae);
        assert!(evaluation.metrics.r2 <= 1.0);

        let total: f64 = evaluation
            .feature_importances
            .iter()
            .map(|f| f.importance)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(evaluation.feature_importances[0].feature, "month_num");
    }

    #[test]
    fn test_evaluate_rejects_empty_test_set() {
        let model = fitted();
        let features = Array2::<f64>::zeros((0, 2));
        let labels = Array1::<f64>::zeros(0);

        let result = Evaluator::evaluate(&model, features.view(), labels.view(), &names());
        assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
    }

    #[test]
    fn test_ranked_importances_ascending() {
        let evaluation = Evaluation {
            predictions: vec![],
            residuals: vec![],
            metrics: RegressionMetrics {
                mae: 0.0,
                rmse: 0.0,
                r2: 1.0,
            },
            feature_importances: vec![
                FeatureImportance {
                    feature: "month_num".to_string(),
                    importance: 0.7,
                },
                FeatureImportance {
                    feature: "passengers_lag1".to_string(),
                    importance: 0.3,
                },
            ],
        };

        let ranked = evaluation.ranked_importances();
        assert_eq!(ranked[0].feature, "passengers_lag1");
        assert_eq!(ranked[1].feature, "month_num");
    }
}
