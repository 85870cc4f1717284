//! High-level data loading utilities.
//!
//! This module combines CSV parsing with source fingerprinting and produces
//! a ready-to-use DataFrame of raw wide-format records.
//!
//! # Example
//!
//! ```no_run
//! use airpax_forecast::io::loaders::PassengerLoader;
//! use std::path::Path;
//!
//! let result = PassengerLoader::load_from_file(Path::new("russian_passenger_air_service.csv"))
//!     .expect("Failed to load");
//! println!("Loaded {} records ({})", result.num_records, result.checksum);
//! ```

pub mod loaders;


pub use loaders::{calculate_checksum, PassengerLoadResult, PassengerLoader};
