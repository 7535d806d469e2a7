//! Dense feed-forward network artifacts

use crate::error::{ForecastError, Result};
use crate::models::{check_width, Regressor};
use serde::{Deserialize, Serialize};

/// Layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// Fully connected layer; `weights[j]` holds the inputs of output unit `j`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                let z = bias + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>();
                self.activation.apply(z)
            })
            .collect()
    }
}

/// Per-feature standardisation applied before the first layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }
}

/// Fitted dense network with a single output unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetModel {
    /// Name of the model
    #[serde(default = "default_name")]
    name: String,
    /// Optional input scaling
    #[serde(default)]
    scaler: Option<StandardScaler>,
    /// Layers from input to output
    layers: Vec<DenseLayer>,
}

fn default_name() -> String {
    "Sequential".to_string()
}

impl NeuralNetModel {
    /// Create a new network
    pub fn new(name: &str, scaler: Option<StandardScaler>, layers: Vec<DenseLayer>) -> Result<Self> {
        let model = Self {
            name: name.to_string(),
            scaler,
            layers,
        };
        model.validate()?;
        Ok(model)
    }

    /// Batch-shaped output for a single sample: one row, one column per output unit
    pub fn predict_batch(&self, features: &[f64]) -> Result<Vec<Vec<f64>>> {
        check_width(&self.name, self.n_features(), features)?;

        let mut activations = match &self.scaler {
            Some(scaler) => scaler.transform(features),
            None => features.to_vec(),
        };
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        Ok(vec![activations])
    }
}

impl Regressor for NeuralNetModel {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        // Unwrap the [[value]] batch shape to a scalar
        match self.predict_batch(features)?.as_slice() {
            [row] => match row.as_slice() {
                [value] => Ok(*value),
                other => Err(ForecastError::ModelError(format!(
                    "{} produced {} outputs, expected 1",
                    self.name,
                    other.len()
                ))),
            },
            rows => Err(ForecastError::ModelError(format!(
                "{} produced {} rows for one sample",
                self.name,
                rows.len()
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    fn validate(&self) -> Result<()> {
        let first = self.layers.first().ok_or_else(|| {
            ForecastError::ModelError(format!("{} has no layers", self.name))
        })?;
        if first.inputs() == 0 {
            return Err(ForecastError::ModelError(format!(
                "{} has an empty input layer",
                self.name
            )));
        }

        let mut width = first.inputs();
        for (index, layer) in self.layers.iter().enumerate() {
            let consistent = layer.outputs() > 0
                && layer.biases.len() == layer.outputs()
                && layer.weights.iter().all(|row| row.len() == width);
            if !consistent {
                return Err(ForecastError::ModelError(format!(
                    "{} layer {} does not match its input width {}",
                    self.name, index, width
                )));
            }
            width = layer.outputs();
        }

        if width != 1 {
            return Err(ForecastError::ModelError(format!(
                "{} has {} output units, expected 1",
                self.name, width
            )));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != first.inputs()
                || scaler.scale.len() != first.inputs()
                || scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite())
            {
                return Err(ForecastError::ModelError(format!(
                    "{} scaler does not match the input layer",
                    self.name
                )));
            }
        }

        Ok(())
    }
}
