//! Recursive multi-step AQI forecasting
//!
//! Each hour's prediction is fed back as the next hour's `aqi_lag_1h`.
//! The loop is bounded by [`FORECAST_HORIZON_HOURS`] and threads an explicit
//! [`ForecastState`] through every step.

use crate::config::{LagStrategy, FORECAST_HORIZON_HOURS};
use crate::data::{naive_timestamp, Observation};
use crate::error::{ForecastError, Result};
use crate::features::{calendar_features, FeatureRow};
use crate::models::Regressor;
use aqi_math::{clamp_non_negative, round_to};
use chrono::{Duration, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// A predicted AQI for one future hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Target hour
    #[serde(with = "naive_timestamp")]
    pub forecast_time: NaiveDateTime,
    /// Prediction rounded to two decimals
    pub predicted_aqi: f64,
}

/// An hourly forecast starting one hour after the seed observation
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Time of the observation the forecast was seeded from
    pub seeded_at: NaiveDateTime,
    /// One point per hour, in time order
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Predicted values in time order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted_aqi).collect()
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the forecast holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Source of additive prediction noise
pub trait NoiseSource {
    /// Draw the next perturbation
    fn sample(&mut self) -> f64;
}

/// Zero-mean Gaussian noise
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    rng: StdRng,
    normal: Normal<f64>,
}

impl GaussianNoise {
    /// Create a noise source; a seed makes runs reproducible
    pub fn new(std_dev: f64, seed: Option<u64>) -> Result<Self> {
        let normal = Normal::new(0.0, std_dev).map_err(|e| {
            ForecastError::InvalidParameter(format!("Invalid noise deviation {}: {}", std_dev, e))
        })?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { rng, normal })
    }
}

impl NoiseSource for GaussianNoise {
    fn sample(&mut self) -> f64 {
        self.normal.sample(&mut self.rng)
    }
}

/// Noise source that never perturbs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl NoiseSource for NoNoise {
    fn sample(&mut self) -> f64 {
        0.0
    }
}

/// Values carried from one step to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastState {
    /// Latest AQI estimate, used as `aqi_lag_1h`
    pub current_aqi: f64,
    /// Estimate before `current_aqi`, for the change rate
    pub previous_aqi: f64,
    /// Carried fine particulate lag
    pub pm2_5: f64,
    /// Carried carbon monoxide lag
    pub co: f64,
    /// Carried nitrogen dioxide lag
    pub no2: f64,
}

impl ForecastState {
    /// Seed the state from the latest real observation
    pub fn seed(latest: &Observation) -> Self {
        Self {
            current_aqi: latest.aqi,
            previous_aqi: latest.aqi,
            pm2_5: latest.pm2_5,
            co: latest.co,
            no2: latest.no2,
        }
    }
}

/// Pollutant concentrations assumed for one target hour
#[derive(Debug, Clone, Copy, PartialEq)]
struct CarriedPollutants {
    pm2_5: f64,
    co: f64,
    no2: f64,
}

/// Generates fixed-horizon forecasts with a selected model
#[derive(Debug)]
pub struct RecursiveForecaster<'a, M: Regressor + ?Sized> {
    model: &'a M,
    feature_names: Vec<String>,
    strategy: LagStrategy,
}

impl<'a, M: Regressor + ?Sized> RecursiveForecaster<'a, M> {
    /// Create a forecaster for a model and its trained feature order
    pub fn new(model: &'a M, feature_names: Vec<String>, strategy: LagStrategy) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(ForecastError::SchemaError(
                "Trained feature name list is empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ForecastError::SchemaError(format!(
                "Trained feature '{}' is listed more than once",
                duplicate
            )));
        }
        if feature_names.len() != model.n_features() {
            return Err(ForecastError::SchemaError(format!(
                "Model {} expects {} features but the feature view lists {}",
                model.name(),
                model.n_features(),
                feature_names.len()
            )));
        }

        Ok(Self {
            model,
            feature_names,
            strategy,
        })
    }

    /// Trained feature order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Forecast [`FORECAST_HORIZON_HOURS`] hours after `latest`.
    ///
    /// Any schema or model failure aborts the whole forecast.
    pub fn forecast(&self, latest: &Observation, noise: &mut dyn NoiseSource) -> Result<Forecast> {
        info!(
            model = self.model.name(),
            strategy = self.strategy.label(),
            start = %latest.datetime,
            horizon = FORECAST_HORIZON_HOURS,
            "Generating recursive forecast"
        );

        let mut state = ForecastState::seed(latest);
        let mut points = Vec::with_capacity(FORECAST_HORIZON_HOURS);

        for step in 1..=FORECAST_HORIZON_HOURS {
            let target = latest.datetime + Duration::hours(step as i64);
            let carried = self.carried_pollutants(latest, &state, step, target.hour());
            let change_rate = match self.strategy {
                LagStrategy::Persistence => 0.0,
                LagStrategy::Decay { .. } => state.current_aqi - state.previous_aqi,
            };

            let row = assemble_row(latest, &state, carried, target, change_rate);
            let ordered = row.reorder(&self.feature_names)?;

            let raw = self.model.predict(&ordered)?;
            if !raw.is_finite() {
                return Err(ForecastError::ModelError(format!(
                    "{} returned a non-finite prediction at step {}",
                    self.model.name(),
                    step
                )));
            }

            let value = match self.strategy {
                LagStrategy::Persistence => raw,
                LagStrategy::Decay { .. } => clamp_non_negative(raw + noise.sample()),
            };

            debug!(step, target = %target, raw, value, "Forecast step");
            points.push(ForecastPoint {
                forecast_time: target,
                predicted_aqi: round_to(value, 2),
            });

            state.previous_aqi = state.current_aqi;
            state.current_aqi = value;
            if let LagStrategy::Decay { .. } = self.strategy {
                state.pm2_5 = carried.pm2_5;
                state.co = carried.co;
                state.no2 = carried.no2;
            }
        }

        Ok(Forecast {
            seeded_at: latest.datetime,
            points,
        })
    }

    fn carried_pollutants(
        &self,
        latest: &Observation,
        state: &ForecastState,
        step: usize,
        hour: u32,
    ) -> CarriedPollutants {
        match &self.strategy {
            LagStrategy::Persistence => CarriedPollutants {
                pm2_5: state.pm2_5,
                co: state.co,
                no2: state.no2,
            },
            LagStrategy::Decay { decay, traffic, .. } => {
                let hours = u32::try_from(step).unwrap_or(u32::MAX);
                let factor = decay.factor(hours) * traffic.multiplier(hour);
                CarriedPollutants {
                    pm2_5: latest.pm2_5 * factor,
                    co: latest.co * factor,
                    no2: latest.no2 * factor,
                }
            }
        }
    }
}

/// Build the feature row for one target hour, in pipeline insertion order
fn assemble_row(
    latest: &Observation,
    state: &ForecastState,
    carried: CarriedPollutants,
    target: NaiveDateTime,
    change_rate: f64,
) -> FeatureRow {
    let (hour, day_of_week, month) = calendar_features(target);

    FeatureRow::new()
        .with("co", carried.co)
        .with("no2", carried.no2)
        .with("o3", latest.o3)
        .with("so2", latest.so2)
        .with("pm2_5", carried.pm2_5)
        .with("pm10", latest.pm10)
        .with("nh3", latest.nh3)
        .with("hour", hour)
        .with("day_of_week", day_of_week)
        .with("month", month)
        .with("aqi_lag_1h", state.current_aqi)
        .with("pm2_5_lag_1h", state.pm2_5)
        .with("co_lag_1h", state.co)
        .with("no2_lag_1h", state.no2)
        .with("aqi_change_rate", change_rate)
}
