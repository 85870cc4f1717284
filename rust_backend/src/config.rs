//! Forecast configuration file support.
//!
//! Settings are read from a TOML file with one table per pipeline stage.
//! Every key is optional and falls back to the built-in default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::algorithms::forest::{
    ForestParams, MaxDepth, MaxFeatures, DEFAULT_MAX_DEPTH, DEFAULT_N_ESTIMATORS, DEFAULT_SEED,
};
use crate::error::{ForecastError, ForecastResult};
use crate::preprocessing::lags::{validate_lag_depth, DEFAULT_LAG_DEPTH};
use crate::preprocessing::split::DEFAULT_CUTOFF_YEAR;
use crate::services::diagnostics::{DEFAULT_HISTOGRAM_BINS, DEFAULT_MIN_TEST_OBSERVATIONS};

pub const CONFIG_FILE_NAME: &str = "forecast.toml";
pub const DEFAULT_DATA_PATH: &str = "russian_passenger_air_service_2.csv";

/// Forecast configuration from file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub diagnostics: DiagnosticsSettings,
}

/// Input table settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

/// Lag and split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSettings {
    #[serde(default = "default_lag_depth")]
    pub lag_depth: usize,
    #[serde(default = "default_cutoff_year")]
    pub cutoff_year: i32,
}

/// Random forest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Grow trees until leaves are pure, ignoring `max_depth`.
    #[serde(default)]
    pub unlimited_depth: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_features")]
    pub max_features: String,
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Report and chart settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSettings {
    #[serde(default)]
    pub airport: Option<String>,
    #[serde(default = "default_min_test_observations")]
    pub min_test_observations: usize,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_lag_depth() -> usize {
    DEFAULT_LAG_DEPTH
}

fn default_cutoff_year() -> i32 {
    DEFAULT_CUTOFF_YEAR
}

fn default_n_estimators() -> usize {
    DEFAULT_N_ESTIMATORS
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_max_features() -> String {
    MaxFeatures::All.to_string()
}

fn default_min_test_observations() -> usize {
    DEFAULT_MIN_TEST_OBSERVATIONS
}

fn default_histogram_bins() -> usize {
    DEFAULT_HISTOGRAM_BINS
}

fn default_preview_rows() -> usize {
    5
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            lag_depth: default_lag_depth(),
            cutoff_year: default_cutoff_year(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            unlimited_depth: false,
            seed: default_seed(),
            max_features: default_max_features(),
            threads: None,
        }
    }
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            airport: None,
            min_test_observations: default_min_test_observations(),
            histogram_bins: default_histogram_bins(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_location() -> Option<PathBuf> {
    [
        PathBuf::from(CONFIG_FILE_NAME),
        PathBuf::from("rust_backend").join(CONFIG_FILE_NAME),
        PathBuf::from("..").join(CONFIG_FILE_NAME),
    ]
    .into_iter()
    .find(|path| path.exists())
}

impl ForecastConfig {
    /// Load forecast configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(ForecastConfig)` if successful
    /// * `Err(ForecastError::ConfigurationError)` if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> ForecastResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse forecast configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ForecastResult<Self> {
        toml::from_str(content).map_err(|e| {
            ForecastError::ConfigurationError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load forecast configuration from the default location.
    ///
    /// Searches for `forecast.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> ForecastResult<Self> {
        match default_location() {
            Some(path) => Self::from_file(path),
            None => Err(ForecastError::ConfigurationError(format!(
                "No {} found in standard locations",
                CONFIG_FILE_NAME
            ))),
        }
    }

    /// Like [`ForecastConfig::from_default_location`], but falls back to the
    /// defaults when no file exists. A file that exists and fails to parse is
    /// still an error.
    pub fn load_or_default() -> ForecastResult<Self> {
        match default_location() {
            Some(path) => {
                info!(path = %path.display(), "Loading forecast configuration");
                Self::from_file(path)
            }
            None => {
                debug!("No {} found; using defaults", CONFIG_FILE_NAME);
                Ok(Self::default())
            }
        }
    }

    pub fn max_depth(&self) -> MaxDepth {
        if self.model.unlimited_depth {
            MaxDepth::Unlimited
        } else {
            MaxDepth::Limited(self.model.max_depth)
        }
    }

    pub fn max_features(&self) -> ForecastResult<MaxFeatures> {
        MaxFeatures::from_str(&self.model.max_features).map_err(ForecastError::ConfigurationError)
    }

    /// Forest hyperparameters described by the `[model]` table.
    pub fn forest_params(&self) -> ForecastResult<ForestParams> {
        let params = ForestParams {
            n_estimators: self.model.n_estimators,
            max_depth: self.max_depth(),
            max_features: self.max_features()?,
            seed: self.model.seed,
            threads: self.model.threads,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check every setting before any data is touched.
    pub fn validate(&self) -> ForecastResult<()> {
        validate_lag_depth(self.features.lag_depth)?;
        self.forest_params()?;

        if self.diagnostics.histogram_bins == 0 {
            return Err(ForecastError::ConfigurationError(
                "diagnostics.histogram_bins must be positive".to_string(),
            ));
        }
        if let Some(airport) = &self.diagnostics.airport {
            if airport.trim().is_empty() {
                return Err(ForecastError::ConfigurationError(
                    "diagnostics.airport must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}
