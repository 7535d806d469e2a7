//! AQI forecasting command line
//!
//! Ingests hourly air quality readings, manages registered models and
//! publishes 72-hour forecasts for the dashboard.

use std::path::PathBuf;

use anyhow::Result;
use aqi_forecast::config::Settings;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// AQI forecasting pipeline
#[derive(Parser)]
#[command(name = "aqi")]
#[command(about = "Hourly air quality ingestion and 72-hour recursive forecasting")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a model, forecast 72 hours and write the artifacts
    Forecast {
        /// Lag handling: "persistence" or "decay"
        #[arg(short, long, default_value = "persistence")]
        lag_strategy: String,

        /// Seed for the decay variant's noise
        #[arg(short, long)]
        seed: Option<u64>,

        /// Noise standard deviation for the decay variant
        #[arg(long)]
        noise_std: Option<f64>,

        /// Model family (defaults to AQI_MODEL_NAME)
        #[arg(short, long)]
        model_name: Option<String>,

        /// Lower end of the R² acceptance band
        #[arg(long)]
        min_r2: Option<f64>,

        /// Upper end of the R² acceptance band
        #[arg(long)]
        max_r2: Option<f64>,
    },

    /// Fetch the current reading and append it to the store
    Ingest,

    /// Replace the store with historical readings
    Backfill {
        /// First day to fetch (YYYY-MM-DD, local time)
        #[arg(long)]
        start: String,

        /// Last day to fetch, inclusive (YYYY-MM-DD, local time)
        #[arg(long)]
        end: String,
    },

    /// Write the engineered training table and feature view
    ExportFeatures {
        /// Output CSV path
        #[arg(short, long, default_value = "data/karachi_aqi_features.csv")]
        output: PathBuf,
    },

    /// Register a model artifact as a new version
    Register {
        /// Path to the model JSON artifact
        #[arg(short = 'f', long)]
        model_file: PathBuf,

        /// Model family (defaults to AQI_MODEL_NAME)
        #[arg(short, long)]
        model_name: Option<String>,

        /// Recorded MAE; evaluated on history when omitted
        #[arg(long)]
        mae: Option<f64>,

        /// Recorded R²; evaluated on history when omitted
        #[arg(long)]
        r2: Option<f64>,
    },

    /// List registered versions against the acceptance band
    Models {
        /// Model family (defaults to AQI_MODEL_NAME)
        #[arg(short, long)]
        model_name: Option<String>,
    },

    /// Print the dashboard summary of the latest forecast
    Summary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Forecast {
            lag_strategy,
            seed,
            noise_std,
            model_name,
            min_r2,
            max_r2,
        } => {
            let options = commands::forecast::Options {
                lag_strategy,
                seed,
                noise_std,
                model_name,
                min_r2,
                max_r2,
            };
            commands::forecast::run(&settings, options)?;
        }
        Commands::Ingest => commands::ingest::run_current(&settings)?,
        Commands::Backfill { start, end } => commands::ingest::run_backfill(&settings, &start, &end)?,
        Commands::ExportFeatures { output } => commands::features::run(&settings, &output)?,
        Commands::Register {
            model_file,
            model_name,
            mae,
            r2,
        } => {
            let family = model_name.unwrap_or_else(|| settings.model_name.clone());
            commands::models::register(&settings, &family, &model_file, mae, r2)?;
        }
        Commands::Models { model_name } => {
            let family = model_name.unwrap_or_else(|| settings.model_name.clone());
            commands::models::list(&settings, &family)?;
        }
        Commands::Summary => commands::summary::run(&settings),
    }

    Ok(())
}
