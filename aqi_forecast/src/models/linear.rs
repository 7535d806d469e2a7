//! Linear regression artifacts (ordinary least squares, ridge, lasso)

use crate::error::{ForecastError, Result};
use crate::models::{check_width, Regressor};
use serde::{Deserialize, Serialize};

/// Fitted linear model: `intercept + coefficients · x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// Name of the model
    #[serde(default = "default_name")]
    name: String,
    /// Bias term
    intercept: f64,
    /// One weight per feature
    coefficients: Vec<f64>,
}

fn default_name() -> String {
    "LinearRegression".to_string()
}

impl LinearModel {
    /// Create a new linear model
    pub fn new(name: &str, intercept: f64, coefficients: Vec<f64>) -> Result<Self> {
        let model = Self {
            name: name.to_string(),
            intercept,
            coefficients,
        };
        model.validate()?;
        Ok(model)
    }

    /// The fitted weights
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The bias term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearModel {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        check_width(&self.name, self.coefficients.len(), features)?;

        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(ForecastError::ModelError(format!(
                "{} has no coefficients",
                self.name
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ForecastError::ModelError(format!(
                "{} has non-finite parameters",
                self.name
            )));
        }
        Ok(())
    }
}
