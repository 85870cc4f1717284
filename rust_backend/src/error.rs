//! Error types for the forecasting pipeline.

/// Result type for pipeline operations
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// Source file missing, unreadable or not parsable as CSV.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Expected columns are absent from the source table.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A train or test partition is empty, so no model or metric can be produced.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ForecastError {
    /// Short category label used when reporting the error.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataUnavailable(_) => "DataUnavailable",
            ForecastError::SchemaError(_) => "SchemaError",
            ForecastError::InsufficientData(_) => "InsufficientData",
            ForecastError::ConfigurationError(_) => "ConfigurationError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_category() {
        let err = ForecastError::InsufficientData("training set is empty".to_string());
        assert_eq!(err.to_string(), "Insufficient data: training set is empty");
        assert_eq!(err.kind(), "InsufficientData");
    }
}
