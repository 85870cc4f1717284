//! Airport passenger forecast CLI
//!
//! Loads the wide passenger table, fits the random forest and prints the
//! evaluation report.
//!
//! # Usage
//!
//! ```bash
//! # Defaults, or forecast.toml when one is found
//! cargo run --bin airpax-forecast -- --input russian_passenger_air_service_2.csv
//!
//! # One lag, deeper trees, machine-readable output
//! cargo run --bin airpax-forecast -- --lags 1 --unlimited-depth --json
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use airpax_forecast::{ForecastConfig, ForecastPipeline, ForecastRun};

#[derive(Parser, Debug)]
#[command(name = "airpax-forecast")]
#[command(about = "Forecast monthly airport passengers with a random forest", long_about = None)]
struct Cli {
    /// Passenger CSV file (overrides [data] path)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Configuration file (default: forecast.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of lag features, 1 to 3
    #[arg(long)]
    lags: Option<usize>,

    /// First year of the test period
    #[arg(long)]
    cutoff_year: Option<i32>,

    /// Number of trees
    #[arg(long)]
    trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Grow trees without a depth limit
    #[arg(long)]
    unlimited_depth: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads used to fit the forest
    #[arg(long)]
    threads: Option<usize>,

    /// Features tried per split: all, sqrt, log2 or a fraction
    #[arg(long)]
    max_features: Option<String>,

    /// Airport to chart (default: the one with the most test months)
    #[arg(long)]
    airport: Option<String>,

    /// Minimum test months for the automatically chosen airport
    #[arg(long)]
    min_test_obs: Option<usize>,

    /// Residual histogram bins
    #[arg(long)]
    bins: Option<usize>,

    /// Rows shown from each intermediate table
    #[arg(long)]
    preview: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, config: &mut ForecastConfig) {
        if let Some(input) = &self.input {
            config.data.path = input.clone();
        }
        if let Some(lags) = self.lags {
            config.features.lag_depth = lags;
        }
        if let Some(year) = self.cutoff_year {
            config.features.cutoff_year = year;
        }
        if let Some(trees) = self.trees {
            config.model.n_estimators = trees;
        }
        if let Some(depth) = self.max_depth {
            config.model.max_depth = depth;
        }
        if self.unlimited_depth {
            config.model.unlimited_depth = true;
        }
        if let Some(seed) = self.seed {
            config.model.seed = seed;
        }
        if self.threads.is_some() {
            config.model.threads = self.threads;
        }
        if let Some(max_features) = &self.max_features {
            config.model.max_features = max_features.clone();
        }
        if self.airport.is_some() {
            config.diagnostics.airport = self.airport.clone();
        }
        if let Some(min) = self.min_test_obs {
            config.diagnostics.min_test_observations = min;
        }
        if let Some(bins) = self.bins {
            config.diagnostics.histogram_bins = bins;
        }
        if let Some(rows) = self.preview {
            config.diagnostics.preview_rows = rows;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ForecastConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ForecastConfig::load_or_default()?,
    };
    cli.apply(&mut config);

    info!(input = %config.data.path.display(), "Starting forecast");

    let preview_rows = config.diagnostics.preview_rows;
    let run = ForecastPipeline::with_config(config)
        .run()
        .context("Forecast failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        print_report(&run, preview_rows);
    }

    Ok(())
}

fn print_report(run: &ForecastRun, preview_rows: usize) {
    let report = &run.report;

    println!("Columns: {}", report.columns.join(", "));
    println!(
        "Rows: {} wide, {} long, {} with lags",
        report.wide_rows, report.long_rows, report.feature_rows
    );
    println!("Checksum: {}", report.checksum);

    if preview_rows > 0 {
        println!("\nLong-format preview:\n{}", run.long_preview(preview_rows));
        println!("\nLag feature preview:\n{}", run.feature_preview(preview_rows));
    }

    for warning in &report.validation.warnings {
        println!("Warning: {}", warning);
    }

    println!(
        "\nTrain size: {}, Test size: {} (cutoff {})",
        report.train_size, report.test_size, report.cutoff
    );
    println!("MAE: {:.2}", report.metrics.mae);
    println!("RMSE: {:.2}", report.metrics.rmse);
    println!("R²: {:.4}", report.metrics.r2);

    println!("\nFeature importances:");
    for item in &report.feature_importances {
        println!("  {:<18} {:.4}", item.feature, item.importance);
    }

    let diagnostics = &report.diagnostics;
    if let Some(extent) = diagnostics.scatter_extent {
        println!(
            "\nPredicted vs actual range: {:.0} .. {:.0}",
            extent.min, extent.max
        );
    }

    match &diagnostics.airport {
        Some(series) => {
            println!("\nTest period for {}:", series.airport);
            println!("  {:<10} {:>14} {:>14}", "date", "actual", "predicted");
            for point in &series.points {
                println!(
                    "  {:<10} {:>14.0} {:>14.0}",
                    point.date, point.actual, point.predicted
                );
            }
        }
        None => println!("\nNo airport has enough test months to chart"),
    }

    println!("\nResidual histogram:");
    let widest = diagnostics
        .residual_histogram
        .iter()
        .map(|bin| bin.count)
        .max()
        .unwrap_or(0)
        .max(1);
    for bin in &diagnostics.residual_histogram {
        let bar = "#".repeat(bin.count * 40 / widest);
        println!(
            "  [{:>12.0}, {:>12.0}) {:>6} {}",
            bin.lower, bin.upper, bin.count, bar
        );
    }
}
