//! Diagnostic views over a test-set evaluation.
//!
//! Everything here is plain data meant for plotting or printing: per-row
//! forecast points, one airport's test-period series, the predicted-vs-actual
//! extent and a residual histogram.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::domain::FeatureObservation;
use crate::error::{ForecastError, ForecastResult};

pub const DEFAULT_MIN_TEST_OBSERVATIONS: usize = 12;
pub const DEFAULT_HISTOGRAM_BINS: usize = 40;

/// Actual and predicted passengers for one test row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub airport: String,
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

impl ForecastPoint {
    pub fn residual(&self) -> f64 {
        self.actual - self.predicted
    }
}

/// Test-period series of a single airport, ordered by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportSeries {
    pub airport: String,
    pub points: Vec<ForecastPoint>,
}

/// Common range of actual and predicted values, for an identity line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterExtent {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Pair test rows with their predictions.
pub fn forecast_points(
    test_rows: &[FeatureObservation],
    predictions: &[f64],
) -> ForecastResult<Vec<ForecastPoint>> {
    if test_rows.len() != predictions.len() {
        return Err(ForecastError::ConfigurationError(format!(
            "{} test rows but {} predictions",
            test_rows.len(),
            predictions.len()
        )));
    }

    Ok(test_rows
        .iter()
        .zip(predictions)
        .map(|(row, predicted)| ForecastPoint {
            airport: row.airport.clone(),
            date: row.date,
            actual: row.passengers,
            predicted: *predicted,
        })
        .collect())
}

/// Test-row count per airport.
pub fn test_counts(points: &[ForecastPoint]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for point in points {
        *counts.entry(point.airport.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Pick the airport to chart.
///
/// An explicit `preferred` airport wins when it has at least one test row.
/// Otherwise the airport with the most test rows is chosen, provided it has
/// at least `min_observations`; ties go to the alphabetically first name.
pub fn select_diagnostic_airport(
    points: &[ForecastPoint],
    min_observations: usize,
    preferred: Option<&str>,
) -> Option<String> {
    let counts = test_counts(points);

    if let Some(name) = preferred {
        return counts.contains_key(name).then(|| name.to_string());
    }

    counts
        .iter()
        .filter(|(_, count)| **count >= min_observations)
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(airport, _)| airport.to_string())
}

/// All test points of `airport`, sorted by date.
pub fn airport_series(points: &[ForecastPoint], airport: &str) -> AirportSeries {
    let mut selected: Vec<ForecastPoint> = points
        .iter()
        .filter(|p| p.airport == airport)
        .cloned()
        .collect();
    selected.sort_by_key(|p| p.date);

    AirportSeries {
        airport: airport.to_string(),
        points: selected,
    }
}

/// Smallest and largest value over both actuals and predictions.
pub fn scatter_extent(points: &[ForecastPoint]) -> Option<ScatterExtent> {
    let values = points.iter().flat_map(|p| [p.actual, p.predicted]);
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    Some(ScatterExtent { min, max })
}

/// Equal-width histogram of `values` over their observed range.
///
/// The last bin is closed on the right. A constant input puts every value
/// into a single zero-width bin.
pub fn histogram(values: &[f64], bins: usize) -> ForecastResult<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(ForecastError::ConfigurationError(
            "histogram needs at least one bin".to_string(),
        ));
    }
    let Some((min, max)) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    }) else {
        return Ok(Vec::new());
    };

    if max == min {
        return Ok(vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }]);
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect())
}

/// Everything the report shows about fit quality beyond the three scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub points: Vec<ForecastPoint>,
    pub scatter_extent: Option<ScatterExtent>,
    pub airport: Option<AirportSeries>,
    pub residual_histogram: Vec<HistogramBin>,
}

impl Diagnostics {
    pub fn build(
        test_rows: &[FeatureObservation],
        predictions: &[f64],
        preferred_airport: Option<&str>,
        min_observations: usize,
        histogram_bins: usize,
    ) -> ForecastResult<Self> {
        let points = forecast_points(test_rows, predictions)?;
        let residuals: Vec<f64> = points.iter().map(ForecastPoint::residual).collect();

        let airport = select_diagnostic_airport(&points, min_observations, preferred_airport)
            .map(|name| airport_series(&points, &name));

        Ok(Self {
            scatter_extent: scatter_extent(&points),
            residual_histogram: histogram(&residuals, histogram_bins)?,
            airport,
            points,
        })
    }

    /// `(predicted, residual)` pairs for a residuals-vs-fitted view.
    pub fn residuals_vs_predicted(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.predicted, p.residual()))
            .collect()
    }
}
