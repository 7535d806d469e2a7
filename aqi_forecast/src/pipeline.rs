//! One inference run: select, forecast, write
//!
//! Every collaborator is an explicit value built once per run. Nothing is
//! written unless selection, loading and all 72 forecast steps succeed.

use crate::config::{ForecastConfig, LagStrategy, Settings};
use crate::data::FeatureStore;
use crate::error::Result;
use crate::features::FeatureView;
use crate::forecaster::{Forecast, GaussianNoise, NoNoise, NoiseSource, RecursiveForecaster};
use crate::models::Regressor;
use crate::registry::ModelRegistry;
use crate::selection::{ModelSelector, Selection};
use crate::writer::{ForecastWriter, ModelInfo};
use chrono::Utc;
use tracing::info;

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct InferenceReport {
    /// The forecast that was written
    pub forecast: Forecast,
    /// The model info that was written
    pub model_info: ModelInfo,
}

/// Wires the store, registry, feature view and writer for inference
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    store: FeatureStore,
    registry: ModelRegistry,
    feature_view: FeatureView,
    writer: ForecastWriter,
    config: ForecastConfig,
}

impl InferencePipeline {
    /// Create a pipeline from explicit collaborators
    pub fn new(
        store: FeatureStore,
        registry: ModelRegistry,
        feature_view: FeatureView,
        writer: ForecastWriter,
        config: ForecastConfig,
    ) -> Self {
        Self {
            store,
            registry,
            feature_view,
            writer,
            config,
        }
    }

    /// Build a pipeline from deployment settings
    pub fn from_settings(settings: &Settings, config: ForecastConfig) -> Result<Self> {
        Ok(Self::new(
            FeatureStore::new(settings.history_path()),
            ModelRegistry::open(&settings.registry_dir),
            FeatureView::from_json_file(&settings.feature_view)?,
            ForecastWriter::new(settings.forecast_path(), settings.model_info_path()),
            config,
        ))
    }

    /// Run configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Run with the noise source implied by the configured lag strategy
    pub fn run(&self) -> Result<InferenceReport> {
        match self.config.lag_strategy() {
            LagStrategy::Persistence => self.run_with_noise(&mut NoNoise),
            LagStrategy::Decay { noise_std, .. } => {
                let mut noise = GaussianNoise::new(*noise_std, self.config.seed())?;
                self.run_with_noise(&mut noise)
            }
        }
    }

    /// Run with an explicit noise source
    pub fn run_with_noise(&self, noise: &mut dyn NoiseSource) -> Result<InferenceReport> {
        let family = self.config.model_name();
        let latest = self.store.latest_observation()?;

        let candidates = self.registry.list_models(family)?;
        let selector = ModelSelector::new(self.config.band());
        let Selection {
            model: chosen,
            degraded,
            candidates: summaries,
        } = selector.select(family, &candidates)?;

        let model = self.registry.load_model(&chosen)?;
        let feature_names = self.feature_view.training_feature_names()?;
        let forecaster =
            RecursiveForecaster::new(&model, feature_names, self.config.lag_strategy().clone())?;
        let forecast = forecaster.forecast(&latest, noise)?;

        let model_info = ModelInfo {
            model_name: model.name().to_string(),
            model_version: chosen.version,
            model_r2: chosen.r2(),
            model_mae: chosen.mae(),
            inference_time: Utc::now(),
            selection_criteria: Some(format!("Best R² within {}", selector.band())),
            degraded_selection: degraded,
            lag_strategy: Some(self.config.lag_strategy().label().to_string()),
            models: summaries,
        };

        self.writer.write(&forecast, &model_info)?;

        info!(
            family,
            version = chosen.version,
            algorithm = %model_info.model_name,
            degraded,
            points = forecast.len(),
            "Inference run complete"
        );

        Ok(InferenceReport {
            forecast,
            model_info,
        })
    }
}
