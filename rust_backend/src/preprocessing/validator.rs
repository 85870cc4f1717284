//! Data-quality checks over the reshaped passenger table.
//!
//! The validator never rejects data on its own. It reports what the reshape
//! and lag stages will discard so a run can be judged before a model is fit.

use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::core::domain::{Observation, RawRecord, MONTH_NAMES};

/// How many airport names a single warning lists before truncating.
const MAX_LISTED_AIRPORTS: usize = 5;

/// Validation result with categorized issues and statistics.
///
/// Errors make `is_valid` false, while warnings are informational.
///
/// # Examples
///
/// ```
/// use airpax_forecast::preprocessing::validator::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// assert!(result.is_valid);
///
/// result.add_warning("2 duplicate observations".to_string());
/// assert!(result.is_valid);
///
/// result.add_error("No observations".to_string());
/// assert!(!result.is_valid);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ValidationStats,
}

/// Summary statistics computed during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_records: usize,
    pub airports: usize,
    pub month_cells: usize,
    pub missing_month_cells: usize,
    pub empty_records: usize,
    pub observations: usize,
    pub duplicate_observations: usize,
    pub airports_without_history: usize,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: ValidationStats::default(),
        }
    }

    /// Adds an error and marks the result as invalid.
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for raw records and their long-format observations
pub struct PassengerValidator;

impl PassengerValidator {
    /// Validate a reshape: `observations` must come from `records`.
    ///
    /// `lag_depth` is used to count airports too short to yield any
    /// lag-augmented row.
    pub fn validate(
        records: &[RawRecord],
        observations: &[Observation],
        lag_depth: usize,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        let stats = &mut result.stats;

        stats.total_records = records.len();
        stats.month_cells = records.len() * MONTH_NAMES.len();
        stats.missing_month_cells = records.iter().map(RawRecord::missing_months).sum();
        stats.empty_records = records
            .iter()
            .filter(|r| r.missing_months() == MONTH_NAMES.len())
            .count();
        stats.observations = observations.len();
        stats.year_min = observations.iter().map(|o| o.date.year()).min();
        stats.year_max = observations.iter().map(|o| o.date.year()).max();

        let mut per_airport: BTreeMap<&str, usize> = BTreeMap::new();
        for obs in observations {
            *per_airport.entry(obs.airport.as_str()).or_default() += 1;
        }
        stats.airports = per_airport.len();

        let mut seen = HashSet::with_capacity(observations.len());
        stats.duplicate_observations = observations
            .iter()
            .filter(|o| !seen.insert((o.airport.as_str(), o.date)))
            .count();

        let short: Vec<&str> = per_airport
            .iter()
            .filter(|(_, count)| **count <= lag_depth)
            .map(|(airport, _)| *airport)
            .collect();
        stats.airports_without_history = short.len();

        let stats = result.stats.clone();

        if stats.observations == 0 {
            result.add_error("No observations remain after dropping missing values".to_string());
        }
        if stats.empty_records > 0 {
            result.add_warning(format!(
                "{} records have no monthly values at all",
                stats.empty_records
            ));
        }
        if stats.duplicate_observations > 0 {
            result.add_warning(format!(
                "{} observations repeat an existing (airport, date) pair",
                stats.duplicate_observations
            ));
        }
        if !short.is_empty() {
            result.add_warning(format!(
                "{} airports have at most {} observations and yield no lagged rows: {}",
                short.len(),
                lag_depth,
                list_airports(&short)
            ));
        }

        result
    }
}

fn list_airports(airports: &[&str]) -> String {
    let mut listed = airports
        .iter()
        .take(MAX_LISTED_AIRPORTS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if airports.len() > MAX_LISTED_AIRPORTS {
        listed.push_str(&format!(" and {} more", airports.len() - MAX_LISTED_AIRPORTS));
    }
    listed
}
