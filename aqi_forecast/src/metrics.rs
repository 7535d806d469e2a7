//! Metrics for evaluating model artifacts against history

use crate::error::{ForecastError, Result};
use crate::features::TrainingRow;
use crate::models::Regressor;
use crate::registry::{MAE, R2};
use aqi_math::stats::{mean_absolute_error, r_squared};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One-step-ahead accuracy of a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Number of rows scored
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Metrics keyed as the registry stores them
    pub fn to_registry_metrics(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([(MAE.to_string(), self.mae), (R2.to_string(), self.r2)])
    }
}

/// Score predictions against actual values
pub fn evaluate_predictions(actual: &[f64], predicted: &[f64]) -> Result<ModelMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::DataError(
            "Predictions and actual values must have the same non-zero length".to_string(),
        ));
    }

    Ok(ModelMetrics {
        mae: mean_absolute_error(actual, predicted)?,
        r2: r_squared(actual, predicted)?,
        n_samples: actual.len(),
    })
}

/// Score a model on engineered rows, using the row label as the target
pub fn evaluate_model<M: Regressor + ?Sized>(
    model: &M,
    feature_names: &[String],
    rows: &[TrainingRow],
) -> Result<ModelMetrics> {
    let mut actual = Vec::with_capacity(rows.len());
    let mut predicted = Vec::with_capacity(rows.len());

    for row in rows {
        let features = row.feature_row().reorder(feature_names)?;
        actual.push(row.aqi);
        predicted.push(model.predict(&features)?);
    }

    let metrics = evaluate_predictions(&actual, &predicted)?;
    info!(
        model = model.name(),
        mae = metrics.mae,
        r2 = metrics.r2,
        rows = metrics.n_samples,
        "Evaluated model"
    );
    Ok(metrics)
}

/// Split rows in time order, keeping the last `test_fraction` for scoring
pub fn chronological_split(
    rows: &[TrainingRow],
    test_fraction: f64,
) -> Result<(&[TrainingRow], &[TrainingRow])> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let test_len = ((rows.len() as f64) * test_fraction).ceil() as usize;
    let split = rows.len().saturating_sub(test_len);
    Ok(rows.split_at(split))
}
