//! Time-based train/test partitioning.
//!
//! Rows dated strictly before January 1st of the cutoff year train the model,
//! every other row is held out for evaluation. There is no shuffling.

use chrono::{Datelike, NaiveDate};
use ndarray::{Array1, Array2};
use tracing::info;

use crate::core::domain::{feature_names, FeatureObservation};
use crate::error::{ForecastError, ForecastResult};

/// Default train/test cutoff year.
pub const DEFAULT_CUTOFF_YEAR: i32 = 2018;

/// Features, labels and source rows of both partitions.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub cutoff: NaiveDate,
    pub feature_names: Vec<String>,
    pub train_features: Array2<f64>,
    pub train_labels: Array1<f64>,
    pub test_features: Array2<f64>,
    pub test_labels: Array1<f64>,
    pub train_rows: Vec<FeatureObservation>,
    pub test_rows: Vec<FeatureObservation>,
}

impl TrainTestSplit {
    pub fn train_size(&self) -> usize {
        self.train_rows.len()
    }

    pub fn test_size(&self) -> usize {
        self.test_rows.len()
    }
}

/// First day of January of `year`.
pub fn cutoff_date(year: i32) -> ForecastResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
        ForecastError::ConfigurationError(format!("cutoff year {} is out of range", year))
    })
}

/// Smallest and largest year among `rows`, if any.
pub fn year_range(rows: &[FeatureObservation]) -> Option<(i32, i32)> {
    let min = rows.iter().map(|r| r.date.year()).min()?;
    let max = rows.iter().map(|r| r.date.year()).max()?;
    Some((min, max))
}

/// Cutoff years that leave at least one full year on both sides.
///
/// Returns `None` when the data spans fewer than three distinct years.
pub fn cutoff_year_bounds(rows: &[FeatureObservation]) -> Option<(i32, i32)> {
    let (min, max) = year_range(rows)?;
    (max - min >= 2).then_some((min + 1, max - 1))
}

/// Partition rows at January 1st of `cutoff_year`.
///
/// Feature vectors are `[month, lag_1, .., lag_N]` with `N = lag_depth`;
/// labels are the rows' passenger counts. Either partition may come out
/// empty, which the forecaster and evaluator reject.
pub fn split_by_cutoff(
    rows: &[FeatureObservation],
    lag_depth: usize,
    cutoff_year: i32,
) -> ForecastResult<TrainTestSplit> {
    let cutoff = cutoff_date(cutoff_year)?;

    if let Some(bad) = rows.iter().find(|r| r.lags.len() != lag_depth) {
        return Err(ForecastError::SchemaError(format!(
            "row for '{}' on {} has {} lags, expected {}",
            bad.airport,
            bad.date,
            bad.lags.len(),
            lag_depth
        )));
    }

    let (train_rows, test_rows): (Vec<FeatureObservation>, Vec<FeatureObservation>) =
        rows.iter().cloned().partition(|r| r.date < cutoff);

    let width = lag_depth + 1;
    let (train_features, train_labels) = to_arrays(&train_rows, width)?;
    let (test_features, test_labels) = to_arrays(&test_rows, width)?;

    info!(
        cutoff = %cutoff,
        train = train_rows.len(),
        test = test_rows.len(),
        "Split rows by cutoff date"
    );

    Ok(TrainTestSplit {
        cutoff,
        feature_names: feature_names(lag_depth),
        train_features,
        train_labels,
        test_features,
        test_labels,
        train_rows,
        test_rows,
    })
}

fn to_arrays(
    rows: &[FeatureObservation],
    width: usize,
) -> ForecastResult<(Array2<f64>, Array1<f64>)> {
    let flat: Vec<f64> = rows.iter().flat_map(|r| r.feature_vector()).collect();
    let features = Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|e| ForecastError::SchemaError(format!("feature matrix shape: {}", e)))?;
    let labels = Array1::from(rows.iter().map(|r| r.passengers).collect::<Vec<_>>());
    Ok((features, labels))
}
