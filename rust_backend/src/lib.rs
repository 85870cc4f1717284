//! Monthly airport passenger forecasting.
//!
//! A wide `Airport name, Year, January..December` table is reshaped into one
//! observation per airport-month, augmented with the previous months' counts,
//! split at a calendar cutoff and fed to a random forest regressor whose test
//! predictions are scored with MAE, RMSE and R².

pub mod algorithms;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod parsing;
pub mod preprocessing;
pub mod services;

pub use config::ForecastConfig;
pub use error::{ForecastError, ForecastResult};
pub use preprocessing::pipeline::{ForecastPipeline, ForecastReport, ForecastRun};
