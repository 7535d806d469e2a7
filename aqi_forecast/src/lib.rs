//! # AQI Forecast
//!
//! A Rust library for hourly air quality forecasting from a registry of
//! trained regression models.
//!
//! ## Features
//!
//! - File-backed feature store of hourly pollutant observations
//! - Model artifacts (linear, tree ensemble, dense neural network) behind one trait
//! - Versioned model registry with recorded MAE and R² metrics
//! - Model selection by an R² acceptance band with a degraded fallback
//! - Recursive 72-hour forecasting with persistence or decay lag handling
//! - Atomic forecast and model info artifacts, plus a dashboard summary
//! - OpenWeather ingestion with linear backoff on transient failures
//!
//! ## Lag strategies
//!
//! Carried pollutant lags evolve according to [`LagStrategy`]:
//!
//! ```rust
//! pub enum LagStrategy {
//!     Persistence,
//!     Decay { /* decay curve, traffic profile, noise */ },
//! }
//! ```
//!
//! - **Persistence**: lags hold the latest observation and the change rate is zero
//! - **Decay**: lags decay 0.8% per hour (floored at 30%), are scaled up in
//!   rush hours, and predictions get small Gaussian noise clamped at zero
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aqi_forecast::config::{AcceptanceBand, ForecastConfig, LagStrategy, Settings};
//! use aqi_forecast::pipeline::InferencePipeline;
//!
//! // Paths and location come from the environment
//! let settings = Settings::from_env()?;
//!
//! // Choose the band and lag handling for this run
//! let config = ForecastConfig::new(
//!     &settings.model_name,
//!     AcceptanceBand::new(0.60, 0.90)?,
//!     LagStrategy::Persistence,
//!     None,
//! )?;
//!
//! // Select a model, forecast 72 hours and write both artifacts
//! let report = InferencePipeline::from_settings(&settings, config)?.run()?;
//! println!("{} points from model v{}", report.forecast.len(), report.model_info.model_version);
//! # Ok::<(), aqi_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod status;
pub mod writer;

// Re-export commonly used types
pub use crate::config::{AcceptanceBand, ForecastConfig, LagStrategy, Settings};
pub use crate::data::{FeatureStore, Observation};
pub use crate::error::ForecastError;
pub use crate::features::{FeatureRow, FeatureView};
pub use crate::forecaster::{Forecast, ForecastPoint, RecursiveForecaster};
pub use crate::models::{Model, Regressor};
pub use crate::registry::{ModelRegistry, RegisteredModel};
pub use crate::selection::{ModelSelector, Selection};
pub use crate::status::AqiStatus;
pub use crate::writer::{ForecastWriter, ModelInfo};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
