//! Parsers for the wide-format passenger table.
//!
//! The source is a CSV file with one row per airport and year and one column
//! per calendar month. [`csv_parser`] reads it into a Polars DataFrame, turns
//! the DataFrame into typed [`RawRecord`](crate::core::domain::RawRecord)s and
//! renders intermediate tables back into DataFrames for previews.
//!
//! # Example
//!
//! ```
//! use airpax_forecast::parsing::csv_parser::{dataframe_to_records, parse_passenger_csv_bytes};
//!
//! let csv = "Airport name,Year,January,February,March,April,May,June,July,August,September,October,November,December\n\
//!            Abakan,2010,1,2,3,4,5,6,7,8,9,10,11,\n";
//! let df = parse_passenger_csv_bytes(csv.as_bytes().to_vec()).expect("Failed to parse passengers");
//! let records = dataframe_to_records(&df).expect("Unexpected schema");
//! assert_eq!(records[0].missing_months(), 1);
//! ```

pub mod csv_parser;
