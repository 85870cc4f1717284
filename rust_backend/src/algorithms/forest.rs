//! Bootstrap-aggregated regression trees.
//!
//! Each tree is grown on a bootstrap resample of the training rows with its
//! own ChaCha stream derived from the forest seed, so fitting is
//! reproducible no matter how rayon schedules the trees.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algorithms::tree::{RegressionTree, TreeParams};
use crate::error::{ForecastError, ForecastResult};

pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_SEED: u64 = 42;

/// Depth limit for every tree of the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxDepth {
    Limited(usize),
    Unlimited,
}

impl MaxDepth {
    pub fn limit(&self) -> Option<usize> {
        match self {
            MaxDepth::Limited(depth) => Some(*depth),
            MaxDepth::Unlimited => None,
        }
    }
}

impl Default for MaxDepth {
    fn default() -> Self {
        MaxDepth::Limited(DEFAULT_MAX_DEPTH)
    }
}

/// How many features each split may consider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    /// Share of the features in `(0, 1]`.
    Fraction(f64),
}

impl MaxFeatures {
    /// Number of candidate features for a model with `n_features` inputs.
    ///
    /// # Examples
    ///
    /// ```
    /// use airpax_forecast::algorithms::forest::MaxFeatures;
    ///
    /// assert_eq!(MaxFeatures::All.resolve(4), 4);
    /// assert_eq!(MaxFeatures::Sqrt.resolve(4), 2);
    /// assert_eq!(MaxFeatures::Log2.resolve(2), 1);
    /// assert_eq!(MaxFeatures::Fraction(0.5).resolve(3), 1);
    /// ```
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let count = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::Fraction(share) => (share * n).floor() as usize,
        };
        count.clamp(1, n_features.max(1))
    }
}

impl Default for MaxFeatures {
    fn default() -> Self {
        MaxFeatures::All
    }
}

impl FromStr for MaxFeatures {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "auto" => Ok(MaxFeatures::All),
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            other => match other.parse::<f64>() {
                Ok(share) if share > 0.0 && share <= 1.0 => Ok(MaxFeatures::Fraction(share)),
                _ => Err(format!(
                    "Unknown max_features: {}. Use 'all', 'sqrt', 'log2' or a fraction in (0, 1]",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => write!(f, "all"),
            MaxFeatures::Sqrt => write!(f, "sqrt"),
            MaxFeatures::Log2 => write!(f, "log2"),
            MaxFeatures::Fraction(share) => write!(f, "{}", share),
        }
    }
}

/// Hyperparameters of the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: MaxDepth,
    pub max_features: MaxFeatures,
    pub seed: u64,
    /// Worker threads for fitting; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: MaxDepth::default(),
            max_features: MaxFeatures::default(),
            seed: DEFAULT_SEED,
            threads: None,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> ForecastResult<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::ConfigurationError(
                "tree count must be positive".to_string(),
            ));
        }
        if self.max_depth == MaxDepth::Limited(0) {
            return Err(ForecastError::ConfigurationError(
                "max depth must be positive or unlimited".to_string(),
            ));
        }
        if let MaxFeatures::Fraction(share) = self.max_features {
            if !(share > 0.0 && share <= 1.0) {
                return Err(ForecastError::ConfigurationError(format!(
                    "max_features fraction must lie in (0, 1], got {}",
                    share
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(ForecastError::ConfigurationError(
                "thread count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A fitted random forest regressor.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Fit the forest on `features` (one row per sample) and `labels`.
    ///
    /// Fails with `InsufficientData` when there are no training rows.
    pub fn fit(
        params: &ForestParams,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
    ) -> ForecastResult<Self> {
        params.validate()?;

        let n_samples = features.nrows();
        if n_samples == 0 {
            return Err(ForecastError::InsufficientData(
                "training set is empty".to_string(),
            ));
        }
        if labels.len() != n_samples {
            return Err(ForecastError::ConfigurationError(format!(
                "{} feature rows but {} labels",
                n_samples,
                labels.len()
            )));
        }

        let n_features = features.ncols();
        let tree_params = TreeParams {
            max_depth: params.max_depth.limit(),
            max_features: params.max_features.resolve(n_features),
            ..TreeParams::default()
        };

        let grow = || -> Vec<RegressionTree> {
            (0..params.n_estimators)
                .into_par_iter()
                .map(|tree_idx| {
                    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
                    rng.set_stream(tree_idx as u64);
                    let samples = bootstrap_sample(n_samples, &mut rng);
                    let tree = RegressionTree::fit(features, labels, samples, &tree_params, &mut rng);
                    debug!(tree = tree_idx, depth = tree.depth(), nodes = tree.nodes().len(), "Grew tree");
                    tree
                })
                .collect()
        };

        let trees = match params.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| {
                    ForecastError::ConfigurationError(format!(
                        "Failed to build thread pool: {}",
                        e
                    ))
                })?
                .install(grow),
            None => grow(),
        };

        info!(
            trees = trees.len(),
            samples = n_samples,
            features = n_features,
            max_depth = ?params.max_depth,
            max_features = %params.max_features,
            "Fitted random forest"
        );

        Ok(Self { trees, n_features })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of all trees' predictions for each row.
    pub fn predict(&self, features: ArrayView2<'_, f64>) -> ForecastResult<Array1<f64>> {
        if features.ncols() != self.n_features {
            return Err(ForecastError::ConfigurationError(format!(
                "model expects {} features, got {}",
                self.n_features,
                features.ncols()
            )));
        }

        let predictions: Vec<f64> = (0..features.nrows())
            .into_par_iter()
            .map(|i| self.predict_row(features.row(i)))
            .collect();
        Ok(Array1::from(predictions))
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Mean of the per-tree normalised importances, renormalised to sum to one.
    ///
    /// When no tree ever split, every feature gets the same share.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (total, importance) in totals.iter_mut().zip(tree.feature_importances()) {
                *total += importance;
            }
        }

        let sum: f64 = totals.iter().sum();
        if sum <= 0.0 {
            return vec![1.0 / self.n_features as f64; self.n_features];
        }
        totals.iter().map(|t| t / sum).collect()
    }
}

/// Draw `n` row indices uniformly with replacement.
fn bootstrap_sample(n: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use proptest::prelude::*;

    fn seasonal_data(rows: usize) -> (Array2<f64>, Array1<f64>) {
        let features = Array2::from_shape_fn((rows, 2), |(i, j)| {
            if j == 0 {
                (i % 12 + 1) as f64
            } else {
                1000.0 + (i as f64) * 3.0
            }
        });
        let labels = Array1::from_shape_fn(rows, |i| {
            1000.0 + (i as f64) * 3.0 + if i % 12 >= 5 && i % 12 <= 7 { 400.0 } else { 0.0 }
        });
        (features, labels)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 16,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_fit_rejects_empty_training_set() {
        let features = Array2::<f64>::zeros((0, 2));
        let labels = Array1::<f64>::zeros(0);
        let result = RandomForestRegressor::fit(&small_params(), features.view(), labels.view());
        assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
    }

    #[test]
    fn test_fit_rejects_invalid_params() {
        let (features, labels) = seasonal_data(24);
        let params = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        let result = RandomForestRegressor::fit(&params, features.view(), labels.view());
        assert!(matches!(result, Err(ForecastError::ConfigurationError(_))));

        let params = ForestParams {
            max_depth: MaxDepth::Limited(0),
            ..ForestParams::default()
        };
        let result = RandomForestRegressor::fit(&params, features.view(), labels.view());
        assert!(matches!(result, Err(ForecastError::ConfigurationError(_))));
    }

    #[test]
    fn test_same_seed_gives_identical_predictions() {
        let (features, labels) = seasonal_data(60);

        let first = RandomForestRegressor::fit(&small_params(), features.view(), labels.view()).unwrap();
        let second = RandomForestRegressor::fit(&small_params(), features.view(), labels.view()).unwrap();

        let a = first.predict(features.view()).unwrap();
        let b = second.predict(features.view()).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert_eq!(first.feature_importances(), second.feature_importances());
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let (features, labels) = seasonal_data(48);
        let single = ForestParams {
            threads: Some(1),
            ..small_params()
        };
        let multi = ForestParams {
            threads: Some(4),
            ..small_params()
        };

        let a = RandomForestRegressor::fit(&single, features.view(), labels.view()).unwrap();
        let b = RandomForestRegressor::fit(&multi, features.view(), labels.view()).unwrap();
        assert_eq!(
            a.predict(features.view()).unwrap(),
            b.predict(features.view()).unwrap()
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let (features, labels) = seasonal_data(60);
        let other = ForestParams {
            seed: 7,
            ..small_params()
        };

        let a = RandomForestRegressor::fit(&small_params(), features.view(), labels.view()).unwrap();
        let b = RandomForestRegressor::fit(&other, features.view(), labels.view()).unwrap();
        assert_ne!(
            a.predict(features.view()).unwrap(),
            b.predict(features.view()).unwrap()
        );
    }

    #[test]
    fn test_forest_fits_training_signal() {
        let (features, labels) = seasonal_data(96);
        let model = RandomForestRegressor::fit(&small_params(), features.view(), labels.view()).unwrap();

        assert_eq!(model.n_trees(), 16);
        let predictions = model.predict(features.view()).unwrap();
        let mae: f64 = predictions
            .iter()
            .zip(labels.iter())
            .map(|(p, a)| (p - a).abs())
            .sum::<f64>()
            / labels.len() as f64;
        // labels span roughly 1000..1700
        assert!(mae < 60.0, "training MAE too high: {}", mae);
    }

    #[test]
    fn test_predict_checks_feature_count() {
        let (features, labels) = seasonal_data(24);
        let model = RandomForestRegressor::fit(&small_params(), features.view(), labels.view()).unwrap();
        let wrong = Array2::<f64>::zeros((3, 5));
        assert!(model.predict(wrong.view()).is_err());
    }

    #[test]
    fn test_constant_target_gives_uniform_importance() {
        let features = Array2::from_shape_fn((10, 4), |(i, j)| (i + j) as f64);
        let labels = Array1::from_elem(10, 3.0);
        let model = RandomForestRegressor::fit(&small_params(), features.view(), labels.view()).unwrap();

        assert_eq!(model.feature_importances(), vec![0.25; 4]);
        assert_eq!(model.predict_row(features.row(0)), 3.0);
    }

    #[test]
    fn test_max_features_parsing() {
        assert_eq!("all".parse::<MaxFeatures>(), Ok(MaxFeatures::All));
        assert_eq!(" SQRT ".parse::<MaxFeatures>(), Ok(MaxFeatures::Sqrt));
        assert_eq!("0.5".parse::<MaxFeatures>(), Ok(MaxFeatures::Fraction(0.5)));
        assert!("1.5".parse::<MaxFeatures>().is_err());
        assert!("half".parse::<MaxFeatures>().is_err());
        assert_eq!(MaxFeatures::Fraction(0.5).to_string(), "0.5");
    }

    proptest! {
        #[test]
        fn prop_importances_are_a_distribution(
            labels in proptest::collection::vec(0.0f64..1.0e6, 8..40),
            seed in any::<u64>(),
        ) {
            let rows = labels.len();
            let features = Array2::from_shape_fn((rows, 3), |(i, j)| ((i * (j + 3)) % 7) as f64);
            let labels = Array1::from(labels);
            let params = ForestParams { n_estimators: 5, seed, ..ForestParams::default() };

            let model = RandomForestRegressor::fit(&params, features.view(), labels.view()).unwrap();
            let importances = model.feature_importances();

            prop_assert!(importances.iter().all(|v| *v >= 0.0));
            prop_assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}
