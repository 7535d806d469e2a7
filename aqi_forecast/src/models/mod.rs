//! Regression model artifacts used for AQI inference
//!
//! Trained artifacts arrive in three shapes: linear models, tree ensembles
//! (random forests and gradient boosting) and small dense neural networks.
//! All of them are exposed through the [`Regressor`] trait so the
//! forecaster never needs to know which kind it is driving.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

pub mod linear;
pub mod neural_net;
pub mod tree_ensemble;

pub use linear::LinearModel;
pub use neural_net::{Activation, DenseLayer, NeuralNetModel, StandardScaler};
pub use tree_ensemble::{Aggregation, Tree, TreeEnsembleModel, TreeNode};

/// A trained single-output regressor
pub trait Regressor: Debug {
    /// Predict one value from features ordered as the model was trained
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Name of the algorithm, e.g. `RandomForestRegressor`
    fn name(&self) -> &str;

    /// Number of input features the model expects
    fn n_features(&self) -> usize;

    /// Check the artifact is internally consistent
    fn validate(&self) -> Result<()>;
}

/// Any supported model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsembleModel),
    NeuralNet(NeuralNetModel),
}

impl Model {
    /// Load and validate a model artifact from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let model: Model = serde_json::from_str(&raw).map_err(|e| {
            ForecastError::ModelError(format!(
                "Cannot parse model artifact {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Short label for the artifact kind
    pub fn kind(&self) -> &'static str {
        match self {
            Model::Linear(_) => "linear",
            Model::TreeEnsemble(_) => "tree_ensemble",
            Model::NeuralNet(_) => "neural_net",
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Model::Linear(model) => model,
            Model::TreeEnsemble(model) => model,
            Model::NeuralNet(model) => model,
        }
    }
}

impl Regressor for Model {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        self.inner().predict(features)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn validate(&self) -> Result<()> {
        self.inner().validate()
    }
}

/// Reject feature slices of the wrong width
pub(crate) fn check_width(model: &str, expected: usize, features: &[f64]) -> Result<()> {
    if features.len() != expected {
        return Err(ForecastError::ModelError(format!(
            "{} expects {} features, got {}",
            model,
            expected,
            features.len()
        )));
    }
    Ok(())
}
