//! Register and models commands - manage registry versions.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use aqi_forecast::config::Settings;
use aqi_forecast::data::FeatureStore;
use aqi_forecast::features::{training_rows, FeatureView};
use aqi_forecast::metrics::{chronological_split, evaluate_model};
use aqi_forecast::models::{Model, Regressor};
use aqi_forecast::registry::{ModelRegistry, MAE, R2};
use aqi_forecast::selection::ModelSelector;
use tracing::info;

/// Share of history held out when metrics are computed on registration
const HOLDOUT_FRACTION: f64 = 0.2;

/// Registers a model artifact as the next version of `family`.
///
/// Metrics not given on the command line are computed on the most recent
/// part of the stored history.
///
/// # Errors
///
/// Returns an error if the artifact is invalid, evaluation fails, or the
/// registry cannot be written.
pub fn register(
    settings: &Settings,
    family: &str,
    model_file: &Path,
    mae: Option<f64>,
    r2: Option<f64>,
) -> Result<()> {
    let model = Model::from_json_file(model_file)
        .with_context(|| format!("Failed to load {}", model_file.display()))?;

    let metrics = match (mae, r2) {
        (Some(mae), Some(r2)) => BTreeMap::from([(MAE.to_string(), mae), (R2.to_string(), r2)]),
        _ => {
            let mut evaluated = evaluate_on_history(settings, &model)?;
            if let Some(mae) = mae {
                evaluated.insert(MAE.to_string(), mae);
            }
            if let Some(r2) = r2 {
                evaluated.insert(R2.to_string(), r2);
            }
            evaluated
        }
    };

    let registry = ModelRegistry::open(&settings.registry_dir);
    let entry = registry.register(family, metrics, &model)?;
    println!(
        "Registered {} v{} ({}), R² {}",
        entry.name,
        entry.version,
        entry.algorithm,
        format_metric(entry.r2())
    );
    Ok(())
}

fn evaluate_on_history(settings: &Settings, model: &Model) -> Result<BTreeMap<String, f64>> {
    let observations = FeatureStore::new(settings.history_path())
        .load_observations()
        .context("Metrics not given and history could not be read")?;
    let feature_view = FeatureView::from_json_file(&settings.feature_view).with_context(|| {
        format!(
            "Failed to read feature view {}",
            settings.feature_view.display()
        )
    })?;

    let rows = training_rows(&observations);
    let (_, holdout) = chronological_split(&rows, HOLDOUT_FRACTION)?;
    let metrics = evaluate_model(model, &feature_view.training_feature_names()?, holdout)
        .with_context(|| format!("Failed to evaluate {}", model.name()))?;

    info!(mae = metrics.mae, r2 = metrics.r2, rows = metrics.n_samples, "Computed holdout metrics");
    Ok(metrics.to_registry_metrics())
}

/// Lists every version of `family` and marks the one selection would pick.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
pub fn list(settings: &Settings, family: &str) -> Result<()> {
    let registry = ModelRegistry::open(&settings.registry_dir);
    let candidates = registry.list_models(family)?;
    if candidates.is_empty() {
        println!("No registered models for '{}'", family);
        return Ok(());
    }

    let selection = ModelSelector::new(settings.band).select(family, &candidates)?;

    println!("Acceptance band: {}", settings.band);
    println!(
        "{:>4}  {:<28} {:>8} {:>8}  {:<7} {}",
        "ver", "algorithm", "mae", "r2", "band", ""
    );
    for candidate in &selection.candidates {
        println!(
            "{:>4}  {:<28} {:>8} {:>8}  {:<7} {}",
            format!("v{}", candidate.version),
            candidate.name,
            format_metric(candidate.mae),
            format_metric(candidate.r2),
            if candidate.in_band { "in" } else { "out" },
            if candidate.selected { "<- selected" } else { "" }
        );
    }
    if selection.degraded {
        println!("No version is within the band; the global best would be used.");
    }
    Ok(())
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}
