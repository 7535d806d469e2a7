//! Forecast command - selects a model and publishes a 72-hour forecast.

use anyhow::{Context, Result};
use aqi_forecast::config::{AcceptanceBand, ForecastConfig, LagStrategy, Settings};
use aqi_forecast::pipeline::InferencePipeline;
use aqi_forecast::status::AqiStatus;
use tracing::{info, warn};

/// Per-run overrides from the command line
#[derive(Debug, Clone)]
pub struct Options {
    pub lag_strategy: String,
    pub seed: Option<u64>,
    pub noise_std: Option<f64>,
    pub model_name: Option<String>,
    pub min_r2: Option<f64>,
    pub max_r2: Option<f64>,
}

/// Runs the forecast command.
///
/// # Errors
///
/// Returns an error if selection, forecasting or writing fails. Nothing is
/// written in that case.
pub fn run(settings: &Settings, options: Options) -> Result<()> {
    let mut lag_strategy: LagStrategy = options.lag_strategy.parse()?;
    if let (LagStrategy::Decay { noise_std, .. }, Some(requested)) =
        (&mut lag_strategy, options.noise_std)
    {
        *noise_std = requested;
    } else if options.noise_std.is_some() {
        warn!("--noise-std only applies to the decay lag strategy, ignoring");
    }

    let band = AcceptanceBand::new(
        options.min_r2.unwrap_or(settings.band.min_r2()),
        options.max_r2.unwrap_or(settings.band.max_r2()),
    )?;
    let model_name = options
        .model_name
        .unwrap_or_else(|| settings.model_name.clone());

    let config = ForecastConfig::new(&model_name, band, lag_strategy, options.seed)?;
    let pipeline = InferencePipeline::from_settings(settings, config).with_context(|| {
        format!(
            "Failed to read feature view {}",
            settings.feature_view.display()
        )
    })?;

    let report = pipeline.run().context("Inference run failed")?;

    let values = report.forecast.values();
    let peak = values.iter().copied().fold(f64::MIN, f64::max);
    info!(
        model = %report.model_info.model_name,
        version = report.model_info.model_version,
        first = values.first().copied().unwrap_or_default(),
        peak,
        peak_status = %AqiStatus::from_value(peak),
        "Forecast published"
    );

    Ok(())
}
