use polars::prelude::*;
use std::io::Cursor;

use crate::core::domain::{
    feature_names, FeatureObservation, Observation, RawRecord, AIRPORT_COLUMN, MONTH_FEATURE,
    MONTH_NAMES, YEAR_COLUMN,
};
use crate::error::{ForecastError, ForecastResult};

/// Parse wide-format passenger CSV content into a Polars DataFrame.
///
/// Header names are trimmed, `Year` is cast to Int32 and every month column
/// present is cast to Float64. Empty cells stay null. A record whose field
/// count differs from the header's fails with `DataUnavailable`.
pub fn parse_passenger_csv_bytes(bytes: Vec<u8>) -> ForecastResult<DataFrame> {
    check_record_lengths(&bytes)?;

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| ForecastError::DataUnavailable(format!("Failed to parse CSV: {}", e)))?;

    trim_column_names(&mut df)?;

    // Numeric columns may be inferred as i64 or, when fully empty, as str
    let column_names = column_names(&df);
    if column_names.iter().any(|c| c == YEAR_COLUMN) {
        cast_in_place(&mut df, YEAR_COLUMN, &DataType::Int32)?;
    }
    for month in MONTH_NAMES {
        if column_names.iter().any(|c| c == month) {
            cast_in_place(&mut df, month, &DataType::Float64)?;
        }
    }

    Ok(df)
}

/// Reject ragged rows before polars pads short ones with nulls.
fn check_record_lengths(bytes: &[u8]) -> ForecastResult<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    for (idx, result) in reader.byte_records().enumerate() {
        result.map_err(|e| {
            ForecastError::DataUnavailable(format!("Malformed CSV record {}: {}", idx + 1, e))
        })?;
    }
    Ok(())
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn trim_column_names(df: &mut DataFrame) -> ForecastResult<()> {
    for name in column_names(df) {
        let trimmed = name.trim();
        if trimmed != name {
            df.rename(&name, trimmed.into()).map_err(|e| {
                ForecastError::DataUnavailable(format!(
                    "Failed to rename column '{}': {}",
                    name, e
                ))
            })?;
        }
    }
    Ok(())
}

fn cast_in_place(df: &mut DataFrame, name: &str, dtype: &DataType) -> ForecastResult<()> {
    let cast = df
        .column(name)
        .and_then(|c| c.strict_cast(dtype))
        .map_err(|e| {
            ForecastError::DataUnavailable(format!(
                "Column '{}' is not convertible to {}: {}",
                name, dtype, e
            ))
        })?;
    df.with_column(cast).map_err(|e| {
        ForecastError::DataUnavailable(format!("Failed to replace column '{}': {}", name, e))
    })?;
    Ok(())
}

/// Names of the required columns absent from `df`, in schema order
pub fn missing_columns(df: &DataFrame) -> Vec<String> {
    let present = column_names(df);
    std::iter::once(AIRPORT_COLUMN)
        .chain(std::iter::once(YEAR_COLUMN))
        .chain(MONTH_NAMES)
        .filter(|required| !present.iter().any(|c| c.as_str() == *required))
        .map(str::to_string)
        .collect()
}

/// Convert a Polars DataFrame to RawRecord structures
pub fn dataframe_to_records(df: &DataFrame) -> ForecastResult<Vec<RawRecord>> {
    let missing = missing_columns(df);
    if !missing.is_empty() {
        return Err(ForecastError::SchemaError(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let to_data_error = |e: PolarsError| ForecastError::DataUnavailable(e.to_string());

    let airport_col = df
        .column(AIRPORT_COLUMN)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(to_data_error)?;
    let airports = airport_col.str().map_err(to_data_error)?;

    let year_col = df
        .column(YEAR_COLUMN)
        .and_then(|c| c.strict_cast(&DataType::Int32))
        .map_err(to_data_error)?;
    let years = year_col.i32().map_err(to_data_error)?;

    let month_cols = MONTH_NAMES
        .iter()
        .map(|m| df.column(m).and_then(|c| c.strict_cast(&DataType::Float64)))
        .collect::<PolarsResult<Vec<Column>>>()
        .map_err(to_data_error)?;
    let month_values = month_cols
        .iter()
        .map(|c| c.f64())
        .collect::<PolarsResult<Vec<_>>>()
        .map_err(to_data_error)?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let airport = airports.get(i).ok_or_else(|| {
            ForecastError::DataUnavailable(format!("Missing {} at row {}", AIRPORT_COLUMN, i))
        })?;
        let year = years.get(i).ok_or_else(|| {
            ForecastError::DataUnavailable(format!("Missing {} at row {}", YEAR_COLUMN, i))
        })?;

        let mut monthly = [None; 12];
        for (slot, values) in monthly.iter_mut().zip(&month_values) {
            *slot = values.get(i);
        }

        records.push(RawRecord::new(airport, year, monthly));
    }

    Ok(records)
}

/// Convert long-format observations to a Polars DataFrame
pub fn observations_to_dataframe(observations: &[Observation]) -> PolarsResult<DataFrame> {
    let airports: Vec<&str> = observations.iter().map(|o| o.airport.as_str()).collect();
    let dates: Vec<String> = observations.iter().map(|o| o.date.to_string()).collect();
    let months: Vec<i32> = observations.iter().map(|o| o.month() as i32).collect();
    let passengers: Vec<f64> = observations.iter().map(|o| o.passengers).collect();

    df!(
        AIRPORT_COLUMN => airports,
        "date" => dates,
        MONTH_FEATURE => months,
        "passengers" => passengers,
    )
}

/// Convert lag-augmented rows to a Polars DataFrame with one column per lag
pub fn features_to_dataframe(
    rows: &[FeatureObservation],
    lag_depth: usize,
) -> PolarsResult<DataFrame> {
    let names = feature_names(lag_depth);

    let mut columns: Vec<Column> = vec![
        Series::new(
            AIRPORT_COLUMN.into(),
            rows.iter().map(|r| r.airport.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "date".into(),
            rows.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "passengers".into(),
            rows.iter().map(|r| r.passengers).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            MONTH_FEATURE.into(),
            rows.iter().map(|r| r.month as i32).collect::<Vec<_>>(),
        )
        .into(),
    ];

    for (k, name) in names.iter().enumerate().skip(1) {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.lag(k)).collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }

    DataFrame::new(columns)
}
