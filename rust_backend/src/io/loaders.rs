use polars::prelude::*;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

use crate::error::{ForecastError, ForecastResult};
use crate::parsing::csv_parser;

/// Hex-encoded SHA-256 of the raw source bytes, used to identify the input.
pub fn calculate_checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Result of loading the passenger table
#[derive(Debug)]
pub struct PassengerLoadResult {
    pub dataframe: DataFrame,
    pub checksum: String,
    pub num_records: usize,
}

impl PassengerLoadResult {
    pub fn new(dataframe: DataFrame, checksum: String) -> Self {
        let num_records = dataframe.height();
        Self {
            dataframe,
            checksum,
            num_records,
        }
    }

    /// Column names after header trimming
    pub fn columns(&self) -> Vec<String> {
        self.dataframe
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Unified interface for loading the wide-format passenger table
pub struct PassengerLoader;

impl PassengerLoader {
    /// Load the passenger table from a CSV file
    pub fn load_from_file(path: &Path) -> ForecastResult<PassengerLoadResult> {
        let bytes = std::fs::read(path).map_err(|e| {
            ForecastError::DataUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let result = Self::load_from_bytes(bytes)?;
        info!(
            path = %path.display(),
            records = result.num_records,
            checksum = %result.checksum,
            "Loaded passenger table"
        );
        Ok(result)
    }

    /// Load the passenger table from CSV content already in memory
    pub fn load_from_str(csv_str: &str) -> ForecastResult<PassengerLoadResult> {
        Self::load_from_bytes(csv_str.as_bytes().to_vec())
    }

    fn load_from_bytes(bytes: Vec<u8>) -> ForecastResult<PassengerLoadResult> {
        let checksum = calculate_checksum(&bytes);
        let df = csv_parser::parse_passenger_csv_bytes(bytes)?;
        Ok(PassengerLoadResult::new(df, checksum))
    }
}
