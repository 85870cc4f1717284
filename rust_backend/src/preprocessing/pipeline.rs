use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::algorithms::forest::{ForestParams, RandomForestRegressor};
use crate::algorithms::metrics::RegressionMetrics;
use crate::config::ForecastConfig;
use crate::core::domain::FeatureObservation;
use crate::error::{ForecastError, ForecastResult};
use crate::io::loaders::{PassengerLoadResult, PassengerLoader};
use crate::parsing::csv_parser;
use crate::preprocessing::lags::build_lag_features;
use crate::preprocessing::reshape::{reshape_table, ReshapedTable};
use crate::preprocessing::split::{cutoff_year_bounds, split_by_cutoff, year_range, TrainTestSplit};
use crate::preprocessing::validator::{PassengerValidator, ValidationResult};
use crate::services::diagnostics::Diagnostics;
use crate::services::evaluation::{Evaluation, Evaluator, FeatureImportance};

/// Serializable summary of one forecasting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Input file, when the table was read from disk
    pub source: Option<String>,
    pub config: ForecastConfig,
    pub checksum: String,
    pub columns: Vec<String>,
    pub wide_rows: usize,
    pub long_rows: usize,
    pub feature_rows: usize,
    pub lag_depth: usize,
    pub cutoff: NaiveDate,
    pub year_range: Option<(i32, i32)>,
    pub train_size: usize,
    pub test_size: usize,
    pub forest: ForestParams,
    pub validation: ValidationResult,
    pub metrics: RegressionMetrics,
    /// Least important first
    pub feature_importances: Vec<FeatureImportance>,
    pub diagnostics: Diagnostics,
}

/// Everything a run produced, including the fitted model
#[derive(Debug)]
pub struct ForecastRun {
    pub report: ForecastReport,
    /// Long-format `(airport, date, month, passengers)` table
    pub long_table: DataFrame,
    /// Lag-augmented table that feeds the split
    pub feature_table: DataFrame,
    pub split: TrainTestSplit,
    pub model: RandomForestRegressor,
    pub evaluation: Evaluation,
}

impl ForecastRun {
    /// First `rows` rows of the long-format table
    pub fn long_preview(&self, rows: usize) -> DataFrame {
        self.long_table.head(Some(rows))
    }

    /// First `rows` rows of the lag-augmented table
    pub fn feature_preview(&self, rows: usize) -> DataFrame {
        self.feature_table.head(Some(rows))
    }
}

/// End-to-end forecasting pipeline: load, reshape, lag, split, fit, evaluate
pub struct ForecastPipeline {
    config: ForecastConfig,
}

impl ForecastPipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Run on the file named by `[data] path`
    pub fn run(&self) -> ForecastResult<ForecastRun> {
        self.run_file(&self.config.data.path)
    }

    /// Run on a passenger CSV file
    pub fn run_file(&self, path: &Path) -> ForecastResult<ForecastRun> {
        self.config.validate()?;
        let loaded = PassengerLoader::load_from_file(path)?;
        self.run_loaded(loaded, Some(path.display().to_string()))
    }

    /// Run on CSV content already in memory
    pub fn run_from_str(&self, csv: &str) -> ForecastResult<ForecastRun> {
        self.config.validate()?;
        let loaded = PassengerLoader::load_from_str(csv)?;
        self.run_loaded(loaded, None)
    }

    fn run_loaded(
        &self,
        loaded: PassengerLoadResult,
        source: Option<String>,
    ) -> ForecastResult<ForecastRun> {
        let lag_depth = self.config.features.lag_depth;
        let cutoff_year = self.config.features.cutoff_year;
        let forest = self.config.forest_params()?;

        info!(columns = ?loaded.columns(), "Columns after header trimming");

        // Step 1: Wide table to long observations
        let ReshapedTable {
            records,
            observations,
        } = reshape_table(&loaded.dataframe)?;

        // Step 2: Validate
        let mut validation = PassengerValidator::validate(&records, &observations, lag_depth);
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        if !validation.is_valid {
            return Err(ForecastError::InsufficientData(validation.errors.join("; ")));
        }

        // Step 3: Lag features and split
        let features = build_lag_features(&observations, lag_depth)?;
        let years = year_range(&features);
        if let Some(warning) = cutoff_warning(&features, cutoff_year) {
            warn!("{}", warning);
            validation.add_warning(warning);
        }
        let split = split_by_cutoff(&features, lag_depth, cutoff_year)?;

        // Step 4: Fit and evaluate
        let model = RandomForestRegressor::fit(
            &forest,
            split.train_features.view(),
            split.train_labels.view(),
        )?;
        let evaluation = Evaluator::evaluate(
            &model,
            split.test_features.view(),
            split.test_labels.view(),
            &split.feature_names,
        )?;

        let settings = &self.config.diagnostics;
        let diagnostics = Diagnostics::build(
            &split.test_rows,
            &evaluation.predictions,
            settings.airport.as_deref(),
            settings.min_test_observations,
            settings.histogram_bins,
        )?;
        if let Some(name) = &settings.airport {
            if diagnostics.airport.is_none() {
                warn!(airport = %name, "Requested airport has no test rows");
            }
        }

        let long_table =
            csv_parser::observations_to_dataframe(&observations).map_err(to_schema_error)?;
        let feature_table =
            csv_parser::features_to_dataframe(&features, lag_depth).map_err(to_schema_error)?;

        let report = ForecastReport {
            source,
            config: self.config.clone(),
            checksum: loaded.checksum.clone(),
            columns: loaded.columns(),
            wide_rows: loaded.num_records,
            long_rows: observations.len(),
            feature_rows: features.len(),
            lag_depth,
            cutoff: split.cutoff,
            year_range: years,
            train_size: split.train_size(),
            test_size: split.test_size(),
            forest,
            validation,
            metrics: evaluation.metrics,
            feature_importances: evaluation.ranked_importances(),
            diagnostics,
        };

        Ok(ForecastRun {
            report,
            long_table,
            feature_table,
            split,
            model,
            evaluation,
        })
    }
}

impl Default for ForecastPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Warning for a cutoff year that does not leave a full year on both sides.
fn cutoff_warning(rows: &[FeatureObservation], cutoff_year: i32) -> Option<String> {
    match cutoff_year_bounds(rows) {
        Some((first, last)) if (first..=last).contains(&cutoff_year) => None,
        Some((first, last)) => Some(format!(
            "Cutoff year {} is outside the supported range {}..={}",
            cutoff_year, first, last
        )),
        None => Some(format!(
            "Data spans fewer than three years, so cutoff year {} cannot leave a full year on both sides",
            cutoff_year
        )),
    }
}

fn to_schema_error(e: PolarsError) -> ForecastError {
    ForecastError::SchemaError(format!("Failed to build table: {}", e))
}

/// Convenience function to run the pipeline with default settings on a file
pub fn run_forecast(path: &Path) -> ForecastResult<ForecastRun> {
    ForecastPipeline::new().run_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_for(airports: &[&str], years: std::ops::RangeInclusive<i32>) -> String {
        let mut csv = String::from(
            "Airport name,Year,January,February,March,April,May,June,July,August,September,October,November,December\n",
        );
        for (a, airport) in airports.iter().enumerate() {
            for year in years.clone() {
                let base = (a as f64 + 1.0) * 1000.0 + (year - 2010) as f64 * 120.0;
                let months: Vec<String> = (1..=12)
                    .map(|m| format!("{}", base + (m * 10) as f64))
                    .collect();
                csv.push_str(&format!("{},{},{}\n", airport, year, months.join(",")));
            }
        }
        csv
    }

    fn small_config(lag_depth: usize, cutoff_year: i32) -> ForecastConfig {
        let mut config = ForecastConfig::default();
        config.features.lag_depth = lag_depth;
        config.features.cutoff_year = cutoff_year;
        config.model.n_estimators = 10;
        config.diagnostics.min_test_observations = 1;
        config
    }

    #[test]
    fn test_pipeline_counts() {
        let csv = csv_for(&["Abakan", "Vnukovo"], 2010..=2012);
        let run = ForecastPipeline::with_config(small_config(1, 2011))
            .run_from_str(&csv)
            .unwrap();

        let report = &run.report;
        assert_eq!(report.wide_rows, 6);
        assert_eq!(report.long_rows, 72);
        assert_eq!(report.feature_rows, 70);
        assert_eq!(report.train_size, 22);
        assert_eq!(report.test_size, 48);
        assert_eq!(report.feature_importances.len(), 2);
        assert_eq!(run.long_preview(5).height(), 5);
        assert_eq!(run.feature_table.height(), 70);
        assert!(report.source.is_none());
    }

    #[test]
    fn test_pipeline_rejects_bad_config() {
        let mut config = small_config(1, 2011);
        config.features.lag_depth = 0;
        let err = ForecastPipeline::with_config(config)
            .run_from_str(&csv_for(&["Abakan"], 2010..=2012))
            .unwrap_err();
        assert!(matches!(err, ForecastError::ConfigurationError(_)));
    }

    #[test]
    fn test_pipeline_flags_cutoff_at_last_year() {
        let run = ForecastPipeline::with_config(small_config(1, 2012))
            .run_from_str(&csv_for(&["Abakan"], 2010..=2012))
            .unwrap();

        assert_eq!(run.report.train_size, 23);
        assert_eq!(run.report.test_size, 12);
        assert!(run
            .report
            .validation
            .warnings
            .iter()
            .any(|w| w.contains("outside the supported range 2011..=2011")));
    }

    #[test]
    fn test_pipeline_cutoff_inside_range_has_no_warning() {
        let run = ForecastPipeline::with_config(small_config(1, 2011))
            .run_from_str(&csv_for(&["Abakan"], 2010..=2012))
            .unwrap();
        assert!(run.report.validation.warnings.is_empty());
    }

    #[test]
    fn test_pipeline_empty_test_partition() {
        let err = ForecastPipeline::with_config(small_config(1, 2030))
            .run_from_str(&csv_for(&["Abakan"], 2010..=2012))
            .unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData(_)));
    }
}
