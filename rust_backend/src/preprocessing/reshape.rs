//! Wide-to-long reshaping of the passenger table.
//!
//! Every raw record expands into up to twelve monthly observations dated on
//! the first day of the month. Empty month cells are dropped, not imputed.

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::info;

use crate::core::domain::{month_number, Observation, RawRecord, MONTH_NAMES};
use crate::error::{ForecastError, ForecastResult};
use crate::parsing::csv_parser;

/// Melt raw records into observations sorted by airport, then date.
///
/// Each month slot is dated through the month-name lookup table.
pub fn melt_records(records: &[RawRecord]) -> ForecastResult<Vec<Observation>> {
    let mut observations = Vec::with_capacity(records.len() * MONTH_NAMES.len());

    for record in records {
        for (name, value) in MONTH_NAMES.iter().zip(&record.monthly) {
            let Some(passengers) = value else {
                continue;
            };
            let month = month_number(name).ok_or_else(|| {
                ForecastError::SchemaError(format!("Unknown month column '{}'", name))
            })?;
            let date = NaiveDate::from_ymd_opt(record.year, month, 1).ok_or_else(|| {
                ForecastError::DataUnavailable(format!(
                    "Invalid year {} for airport '{}'",
                    record.year, record.airport
                ))
            })?;
            observations.push(Observation::new(record.airport.clone(), date, *passengers));
        }
    }

    sort_chronologically(&mut observations);
    Ok(observations)
}

/// Typed records and the long-format observations melted from them.
#[derive(Debug, Clone)]
pub struct ReshapedTable {
    pub records: Vec<RawRecord>,
    pub observations: Vec<Observation>,
}

/// Reshape a wide-format DataFrame into sorted long-format observations.
///
/// Fails with `SchemaError` when the airport, year or month columns are absent.
pub fn reshape_table(df: &DataFrame) -> ForecastResult<ReshapedTable> {
    let records = csv_parser::dataframe_to_records(df)?;
    let observations = melt_records(&records)?;
    info!(
        records = records.len(),
        observations = observations.len(),
        "Reshaped passenger table to long format"
    );
    Ok(ReshapedTable {
        records,
        observations,
    })
}

/// Order observations by airport name, then by date.
pub fn sort_chronologically(observations: &mut [Observation]) {
    observations.sort_by(|a, b| a.airport.cmp(&b.airport).then(a.date.cmp(&b.date)));
}

/// `true` when observations are already ordered by airport name, then date.
pub fn is_chronological(observations: &[Observation]) -> bool {
    observations.windows(2).all(|pair| {
        (pair[0].airport.as_str(), pair[0].date) <= (pair[1].airport.as_str(), pair[1].date)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::csv_parser::parse_passenger_csv_bytes;
    use chrono::Datelike;

    fn full_year(base: f64) -> [Option<f64>; 12] {
        let mut monthly = [None; 12];
        for (idx, slot) in monthly.iter_mut().enumerate() {
            *slot = Some(base + idx as f64);
        }
        monthly
    }

    #[test]
    fn test_melt_dates_match_source_columns() {
        let records = vec![RawRecord::new("Abakan", 2014, full_year(100.0))];
        let observations = melt_records(&records).unwrap();

        assert_eq!(observations.len(), 12);
        for obs in &observations {
            assert_eq!(obs.date.year(), 2014);
            assert_eq!(obs.date.day(), 1);
            // January carries base + 0, December base + 11
            assert_eq!(obs.passengers, 100.0 + (obs.date.month() - 1) as f64);
        }
    }

    #[test]
    fn test_melt_drops_missing_values() {
        let mut monthly = full_year(1.0);
        monthly[2] = None;
        monthly[7] = None;
        let records = vec![RawRecord::new("Anadyr", 2010, monthly)];

        let observations = melt_records(&records).unwrap();
        assert_eq!(observations.len(), 10);
        assert!(observations.iter().all(|o| o.month() != 3 && o.month() != 8));
    }

    #[test]
    fn test_melt_sorts_by_airport_then_date() {
        let records = vec![
            RawRecord::new("Vnukovo", 2011, full_year(1.0)),
            RawRecord::new("Abakan", 2011, full_year(1.0)),
            RawRecord::new("Abakan", 2010, full_year(1.0)),
        ];

        let observations = melt_records(&records).unwrap();
        assert_eq!(observations.len(), 36);
        assert!(is_chronological(&observations));
        assert_eq!(observations[0].airport, "Abakan");
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(observations[23].date, NaiveDate::from_ymd_opt(2011, 12, 1).unwrap());
        assert_eq!(observations[24].airport, "Vnukovo");
    }

    #[test]
    fn test_reshape_table_requires_identifiers() {
        let csv = "Airport name,January,February,March,April,May,June,July,August,September,October,November,December\nAbakan,1,2,3,4,5,6,7,8,9,10,11,12\n";
        let df = parse_passenger_csv_bytes(csv.as_bytes().to_vec()).unwrap();

        let result = reshape_table(&df);
        assert!(matches!(result, Err(ForecastError::SchemaError(_))));
    }

    #[test]
    fn test_reshape_table_end_to_end() {
        let csv = "Airport name,Year,January,February,March,April,May,June,July,August,September,October,November,December\nAbakan,2010,1,2,3,4,5,6,7,8,9,10,,\n";
        let df = parse_passenger_csv_bytes(csv.as_bytes().to_vec()).unwrap();

        let reshaped = reshape_table(&df).unwrap();
        assert_eq!(reshaped.records.len(), 1);
        assert_eq!(reshaped.observations.len(), 10);
        assert_eq!(reshaped.observations.last().unwrap().month(), 10);
    }

    #[test]
    fn test_is_chronological_detects_disorder() {
        let a = Observation::new("A", NaiveDate::from_ymd_opt(2010, 2, 1).unwrap(), 1.0);
        let b = Observation::new("A", NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(), 1.0);
        assert!(!is_chronological(&[a.clone(), b.clone()]));
        assert!(is_chronological(&[b, a]));
    }
}
