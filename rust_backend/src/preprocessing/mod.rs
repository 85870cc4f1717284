//! From the wide passenger table to model-ready train and test matrices.

pub mod lags;
pub mod pipeline;
pub mod reshape;
pub mod split;
pub mod validator;

pub use lags::build_lag_features;
pub use pipeline::{run_forecast, ForecastPipeline, ForecastReport, ForecastRun};
pub use reshape::{melt_records, reshape_table, ReshapedTable};
pub use split::{split_by_cutoff, TrainTestSplit};
pub use validator::{PassengerValidator, ValidationResult, ValidationStats};
