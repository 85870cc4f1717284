//! Services that turn a fitted model into reportable results.
//!
//! [`evaluation`] scores the forest on the held-out rows; [`diagnostics`]
//! derives chart-ready data from the same predictions.

pub mod diagnostics;
pub mod evaluation;

pub use diagnostics::{AirportSeries, Diagnostics, ForecastPoint, HistogramBin, ScatterExtent};
pub use evaluation::{Evaluation, Evaluator, FeatureImportance};
