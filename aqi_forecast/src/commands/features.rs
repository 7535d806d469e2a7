//! Export-features command - writes the engineered training table.

use std::path::Path;

use anyhow::{Context, Result};
use aqi_forecast::config::Settings;
use aqi_forecast::data::FeatureStore;
use aqi_forecast::features::{training_rows, write_training_rows, FeatureView};
use tracing::{info, warn};

/// Feature view name written next to the store
const FEATURE_VIEW_NAME: &str = "karachi_aqi_view";

/// Runs the export-features command.
///
/// Also writes the standard feature view definition when none exists yet.
///
/// # Errors
///
/// Returns an error if the store cannot be read or an output cannot be written.
pub fn run(settings: &Settings, output: &Path) -> Result<()> {
    let store = FeatureStore::new(settings.history_path());
    let observations = store
        .load_observations()
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    let rows = training_rows(&observations);
    if rows.is_empty() {
        warn!(
            observations = observations.len(),
            "Not enough observations to engineer lag features"
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_training_rows(output, &rows)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(rows = rows.len(), path = %output.display(), "Exported training features");

    if !settings.feature_view.exists() {
        FeatureView::standard(FEATURE_VIEW_NAME, 1).save_json_file(&settings.feature_view)?;
        info!(path = %settings.feature_view.display(), "Wrote feature view definition");
    }

    Ok(())
}
