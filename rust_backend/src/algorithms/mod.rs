//! Regression model and accuracy metrics.
//!
//! # Components
//!
//! - [`tree`]: CART regression tree grown on bootstrap sample indices
//! - [`forest`]: Seeded, rayon-parallel random forest regressor
//! - [`metrics`]: MAE, RMSE and R² over paired actual/predicted values
//!
//! # Example
//!
//! ```
//! use airpax_forecast::algorithms::{ForestParams, RandomForestRegressor};
//! use ndarray::array;
//!
//! let features = array![[1.0, 10.0], [2.0, 12.0], [3.0, 30.0], [4.0, 33.0]];
//! let labels = array![11.0, 13.0, 31.0, 35.0];
//! let params = ForestParams { n_estimators: 10, ..ForestParams::default() };
//!
//! let model = RandomForestRegressor::fit(&params, features.view(), labels.view()).unwrap();
//! let predictions = model.predict(features.view()).unwrap();
//! assert_eq!(predictions.len(), 4);
//! ```

pub mod forest;
pub mod metrics;
pub mod tree;

pub use forest::{ForestParams, MaxDepth, MaxFeatures, RandomForestRegressor};
pub use metrics::RegressionMetrics;
pub use tree::{RegressionTree, TreeParams};
