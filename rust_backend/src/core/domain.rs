//! Domain models for airport passenger observations.
//!
//! This module provides the records that flow through the forecasting pipeline:
//! the wide-format source rows, the long-format monthly observations, and the
//! lag-augmented rows the regressor is trained on.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Column holding the airport identifier in the source table.
pub const AIRPORT_COLUMN: &str = "Airport name";

/// Column holding the calendar year in the source table.
pub const YEAR_COLUMN: &str = "Year";

/// The twelve month columns of the wide-format schema, in calendar order.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Name of the month-number feature.
pub const MONTH_FEATURE: &str = "month_num";

/// Maps an English month name to its calendar number (January = 1).
///
/// # Examples
///
/// ```
/// use airpax_forecast::core::domain::month_number;
///
/// assert_eq!(month_number("January"), Some(1));
/// assert_eq!(month_number("December"), Some(12));
/// assert_eq!(month_number("Smarch"), None);
/// ```
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

/// Name of the k-th lag feature (`passengers_lag1`, `passengers_lag2`, ...).
pub fn lag_feature_name(k: usize) -> String {
    format!("passengers_lag{}", k)
}

/// Feature names in model order: month number followed by `lag_depth` lags.
///
/// # Examples
///
/// ```
/// use airpax_forecast::core::domain::feature_names;
///
/// assert_eq!(
///     feature_names(2),
///     vec!["month_num", "passengers_lag1", "passengers_lag2"]
/// );
/// ```
pub fn feature_names(lag_depth: usize) -> Vec<String> {
    std::iter::once(MONTH_FEATURE.to_string())
        .chain((1..=lag_depth).map(lag_feature_name))
        .collect()
}

/// One source row: an airport's passenger counts for every month of a year.
///
/// `monthly[0]` holds January, `monthly[11]` December. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub airport: String,
    pub year: i32,
    pub monthly: [Option<f64>; 12],
}

impl RawRecord {
    pub fn new(airport: impl Into<String>, year: i32, monthly: [Option<f64>; 12]) -> Self {
        Self {
            airport: airport.into(),
            year,
            monthly,
        }
    }

    /// Number of month cells without a value.
    pub fn missing_months(&self) -> usize {
        self.monthly.iter().filter(|v| v.is_none()).count()
    }
}

/// Passenger count for one airport in one calendar month.
///
/// The date is always the first day of the month.
///
/// # Examples
///
/// ```
/// use airpax_forecast::core::domain::Observation;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2015, 3, 1).unwrap();
/// let obs = Observation::new("Sheremetyevo", date, 2_400_000.0);
/// assert_eq!(obs.month(), 3);
/// assert_eq!(obs.year(), 2015);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub airport: String,
    pub date: NaiveDate,
    pub passengers: f64,
}

impl Observation {
    pub fn new(airport: impl Into<String>, date: NaiveDate, passengers: f64) -> Self {
        Self {
            airport: airport.into(),
            date,
            passengers,
        }
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// An observation extended with its month number and lagged passenger counts.
///
/// `lags[0]` is the count one period earlier for the same airport, `lags[1]`
/// two periods earlier, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureObservation {
    pub airport: String,
    pub date: NaiveDate,
    pub month: u32,
    pub passengers: f64,
    pub lags: Vec<f64>,
}

impl FeatureObservation {
    /// Model input for this row: `[month, lag_1, .., lag_N]`.
    pub fn feature_vector(&self) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.lags.len() + 1);
        features.push(self.month as f64);
        features.extend_from_slice(&self.lags);
        features
    }

    pub fn lag(&self, k: usize) -> Option<f64> {
        k.checked_sub(1).and_then(|idx| self.lags.get(idx).copied())
    }
}
