//! Persisting the forecast and model info artifacts

use crate::data::parent_dir;
use crate::error::{ForecastError, Result};
use crate::forecaster::Forecast;
use crate::selection::CandidateSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Metadata describing which model produced a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Algorithm name of the selected model
    pub model_name: String,
    /// Registry version of the selected model
    pub model_version: u32,
    /// R² of the selected model, if recorded
    pub model_r2: Option<f64>,
    /// MAE of the selected model, if recorded
    #[serde(default)]
    pub model_mae: Option<f64>,
    /// When inference ran
    pub inference_time: DateTime<Utc>,
    /// Human-readable selection rule
    #[serde(default)]
    pub selection_criteria: Option<String>,
    /// True when no model was within the acceptance band
    #[serde(default)]
    pub degraded_selection: bool,
    /// Lag handling variant used for the forecast
    #[serde(default)]
    pub lag_strategy: Option<String>,
    /// Every candidate for comparison display
    #[serde(default)]
    pub models: Vec<CandidateSummary>,
}

/// Writes both artifacts, replacing earlier runs
#[derive(Debug, Clone)]
pub struct ForecastWriter {
    forecast_path: PathBuf,
    model_info_path: PathBuf,
}

impl ForecastWriter {
    /// Create a writer for the two artifact paths
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(forecast_path: P, model_info_path: Q) -> Self {
        Self {
            forecast_path: forecast_path.as_ref().to_path_buf(),
            model_info_path: model_info_path.as_ref().to_path_buf(),
        }
    }

    /// Forecast CSV path
    pub fn forecast_path(&self) -> &Path {
        &self.forecast_path
    }

    /// Model info JSON path
    pub fn model_info_path(&self) -> &Path {
        &self.model_info_path
    }

    /// Write the forecast CSV and model info JSON.
    ///
    /// Both files are fully staged next to their targets before either is
    /// renamed into place. If the model info cannot be put in place the
    /// previous forecast is restored, so a failure leaves the previous
    /// artifacts intact.
    pub fn write(&self, forecast: &Forecast, info: &ModelInfo) -> Result<()> {
        if forecast.is_empty() {
            return Err(ForecastError::DataError(
                "Refusing to write an empty forecast".to_string(),
            ));
        }

        let staged_forecast = stage_forecast(&self.forecast_path, forecast)?;
        let staged_info = stage_model_info(&self.model_info_path, info)?;

        let previous_forecast = backup_existing(&self.forecast_path)?;
        staged_forecast.persist(&self.forecast_path)?;
        if let Err(e) = staged_info.persist(&self.model_info_path) {
            restore_forecast(&self.forecast_path, previous_forecast)?;
            return Err(e.into());
        }

        info!(
            forecast = %self.forecast_path.display(),
            model_info = %self.model_info_path.display(),
            points = forecast.len(),
            "Saved forecast artifacts"
        );
        Ok(())
    }
}

/// Copy of the current file at `target`, if there is one
fn backup_existing(target: &Path) -> Result<Option<NamedTempFile>> {
    if !target.is_file() {
        return Ok(None);
    }
    let backup = staging_file(target)?;
    std::fs::copy(target, backup.path())?;
    Ok(Some(backup))
}

fn restore_forecast(target: &Path, previous: Option<NamedTempFile>) -> Result<()> {
    match previous {
        Some(backup) => {
            backup.persist(target)?;
        }
        None => std::fs::remove_file(target)?,
    }
    warn!(path = %target.display(), "Rolled back forecast after failed model info write");
    Ok(())
}

fn staging_file(target: &Path) -> Result<NamedTempFile> {
    let dir = parent_dir(target);
    std::fs::create_dir_all(dir)?;
    Ok(NamedTempFile::new_in(dir)?)
}

fn stage_forecast(target: &Path, forecast: &Forecast) -> Result<NamedTempFile> {
    let staged = staging_file(target)?;
    {
        let mut writer = csv::Writer::from_writer(staged.as_file());
        writer.write_record(["forecast_time", "predicted_aqi"])?;
        for point in &forecast.points {
            writer.write_record([
                point
                    .forecast_time
                    .format(crate::data::TIMESTAMP_FORMAT)
                    .to_string(),
                format!("{:.2}", point.predicted_aqi),
            ])?;
        }
        writer.flush()?;
    }
    staged.as_file().sync_all()?;
    Ok(staged)
}

fn stage_model_info(target: &Path, info: &ModelInfo) -> Result<NamedTempFile> {
    let mut staged = staging_file(target)?;
    serde_json::to_writer_pretty(staged.as_file_mut(), info)?;
    staged.write_all(b"\n")?;
    staged.as_file().sync_all()?;
    Ok(staged)
}
