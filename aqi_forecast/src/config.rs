//! Run configuration
//!
//! [`Settings`] holds deployment concerns (paths, API token, location) read
//! from the environment. [`ForecastConfig`] holds the knobs of one
//! forecasting run and is validated when it is built.

use crate::error::{ForecastError, Result};
use aqi_math::{PollutantDecay, TrafficProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Number of hourly points in every forecast
pub const FORECAST_HORIZON_HOURS: usize = 72;

/// Default model family in the registry
pub const DEFAULT_MODEL_NAME: &str = "karachi_aqi_model";

/// Closed R² range within which a model is trusted for deployment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceBand {
    min_r2: f64,
    max_r2: f64,
}

impl AcceptanceBand {
    /// Create a new band; both ends are inclusive
    pub fn new(min_r2: f64, max_r2: f64) -> Result<Self> {
        if !min_r2.is_finite() || !max_r2.is_finite() || min_r2 > max_r2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Acceptance band [{}, {}] is not a valid range",
                min_r2, max_r2
            )));
        }
        Ok(Self { min_r2, max_r2 })
    }

    /// Lower bound (below it a model is underfit)
    pub fn min_r2(&self) -> f64 {
        self.min_r2
    }

    /// Upper bound (above it a model is likely overfit or leaking)
    pub fn max_r2(&self) -> f64 {
        self.max_r2
    }

    /// Whether a score lies in the band
    pub fn contains(&self, r2: f64) -> bool {
        (self.min_r2..=self.max_r2).contains(&r2)
    }
}

impl Default for AcceptanceBand {
    fn default() -> Self {
        Self {
            min_r2: 0.60,
            max_r2: 0.90,
        }
    }
}

impl fmt::Display for AcceptanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} <= R² <= {:.2}", self.min_r2, self.max_r2)
    }
}

/// How carried pollutant lags evolve across the horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LagStrategy {
    /// Pollutant lags stay at the latest observation; change rate is zero
    #[default]
    Persistence,
    /// Pollutants decay with traffic scaling, predictions are perturbed
    /// with Gaussian noise and clamped at zero
    Decay {
        decay: PollutantDecay,
        traffic: TrafficProfile,
        noise_std: f64,
    },
}

impl LagStrategy {
    /// Decay variant with the stock curves and noise
    pub fn decay() -> Self {
        LagStrategy::Decay {
            decay: PollutantDecay::default(),
            traffic: TrafficProfile::default(),
            noise_std: 0.05,
        }
    }

    /// Short label used in logs and model info
    pub fn label(&self) -> &'static str {
        match self {
            LagStrategy::Persistence => "persistence",
            LagStrategy::Decay { .. } => "decay",
        }
    }
}

impl FromStr for LagStrategy {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "persistence" | "constant" => Ok(LagStrategy::Persistence),
            "decay" => Ok(LagStrategy::decay()),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown lag strategy '{}', expected 'persistence' or 'decay'",
                other
            ))),
        }
    }
}

/// Parameters of one forecasting run
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Model family to select from
    model_name: String,
    /// R² acceptance band for selection
    band: AcceptanceBand,
    /// Lag handling variant
    lag_strategy: LagStrategy,
    /// Seed for the noise generator of the decay variant
    seed: Option<u64>,
}

impl ForecastConfig {
    /// Create a validated configuration
    pub fn new(
        model_name: &str,
        band: AcceptanceBand,
        lag_strategy: LagStrategy,
        seed: Option<u64>,
    ) -> Result<Self> {
        if model_name.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Model name must not be empty".to_string(),
            ));
        }
        if let LagStrategy::Decay { noise_std, .. } = &lag_strategy {
            if !noise_std.is_finite() || *noise_std < 0.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "Noise standard deviation must be non-negative, got {}",
                    noise_std
                )));
            }
        }

        Ok(Self {
            model_name: model_name.to_string(),
            band,
            lag_strategy,
            seed,
        })
    }

    /// Model family to select from
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Acceptance band
    pub fn band(&self) -> AcceptanceBand {
        self.band
    }

    /// Lag handling variant
    pub fn lag_strategy(&self) -> &LagStrategy {
        &self.lag_strategy
    }

    /// Noise seed
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            band: AcceptanceBand::default(),
            lag_strategy: LagStrategy::default(),
            seed: None,
        }
    }
}

/// Deployment settings loaded from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenWeather API key, needed only for ingestion
    pub openweather_token: Option<String>,
    /// Directory holding the store and forecast artifacts
    pub data_dir: PathBuf,
    /// Model registry root
    pub registry_dir: PathBuf,
    /// Feature view definition
    pub feature_view: PathBuf,
    /// Model family to select from
    pub model_name: String,
    /// Acceptance band for selection
    pub band: AcceptanceBand,
    /// Location latitude
    pub lat: f64,
    /// Location longitude
    pub lon: f64,
    /// Offset of local wall-clock time from UTC, in hours
    pub utc_offset_hours: i32,
}

impl Settings {
    /// Loads settings from environment variables, reading `.env` first.
    ///
    /// Recognised variables:
    /// - `OPENWEATHER_TOKEN`: API key for ingestion
    /// - `AQI_DATA_DIR`: store and artifact directory (default: `data`)
    /// - `AQI_REGISTRY_DIR`: registry root (default: `registry`)
    /// - `AQI_FEATURE_VIEW`: feature view JSON (default: `<data>/feature_view.json`)
    /// - `AQI_MODEL_NAME`: model family (default: `karachi_aqi_model`)
    /// - `AQI_MIN_R2`, `AQI_MAX_R2`: acceptance band (default: 0.60 and 0.90)
    /// - `AQI_LAT`, `AQI_LON`: location (default: Karachi)
    /// - `AQI_UTC_OFFSET_HOURS`: local time offset (default: 5)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let data_dir = PathBuf::from(env_or("AQI_DATA_DIR", "data"));
        let feature_view = std::env::var("AQI_FEATURE_VIEW")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("feature_view.json"));
        let defaults = AcceptanceBand::default();

        Ok(Self {
            openweather_token: std::env::var("OPENWEATHER_TOKEN").ok(),
            registry_dir: PathBuf::from(env_or("AQI_REGISTRY_DIR", "registry")),
            feature_view,
            data_dir,
            model_name: env_or("AQI_MODEL_NAME", DEFAULT_MODEL_NAME),
            band: AcceptanceBand::new(
                env_parse("AQI_MIN_R2", defaults.min_r2())?,
                env_parse("AQI_MAX_R2", defaults.max_r2())?,
            )?,
            lat: env_parse("AQI_LAT", 24.8607)?,
            lon: env_parse("AQI_LON", 67.0011)?,
            utc_offset_hours: env_parse("AQI_UTC_OFFSET_HOURS", 5)?,
        })
    }

    /// History CSV backing the feature store
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("karachi_aqi_history.csv")
    }

    /// Forecast CSV artifact
    pub fn forecast_path(&self) -> PathBuf {
        self.data_dir.join("aqi_forecast_72h.csv")
    }

    /// Model info JSON artifact
    pub fn model_info_path(&self) -> PathBuf {
        self.data_dir.join("model_info.json")
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            ForecastError::InvalidParameter(format!("{} = '{}': {}", key, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
