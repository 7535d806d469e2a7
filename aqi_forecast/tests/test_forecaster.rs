use assert_approx_eq::assert_approx_eq;
use aqi_forecast::config::{LagStrategy, FORECAST_HORIZON_HOURS};
use aqi_forecast::data::Observation;
use aqi_forecast::error::{ForecastError, Result};
use aqi_forecast::features::DEFAULT_FEATURE_NAMES;
use aqi_forecast::forecaster::{GaussianNoise, NoNoise, NoiseSource, RecursiveForecaster};
use aqi_forecast::models::{LinearModel, Regressor};
use chrono::{Duration, NaiveDateTime, Timelike};
use pretty_assertions::assert_eq;
use std::cell::RefCell;

fn create_latest() -> Observation {
    Observation {
        datetime: NaiveDateTime::parse_from_str("2025-01-15 13:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap(),
        aqi: 3.0,
        co: 450.0,
        no2: 20.0,
        o3: 35.0,
        so2: 8.0,
        pm2_5: 60.0,
        pm10: 95.0,
        nh3: 4.0,
    }
}

fn feature_names() -> Vec<String> {
    DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Linear model that mostly follows the AQI lag
fn create_lag_model() -> LinearModel {
    let mut coefficients = vec![0.0; DEFAULT_FEATURE_NAMES.len()];
    let lag = DEFAULT_FEATURE_NAMES
        .iter()
        .position(|n| *n == "aqi_lag_1h")
        .unwrap();
    coefficients[lag] = 0.9;
    LinearModel::new("Ridge", 0.4, coefficients).unwrap()
}

/// Records every row it is asked to predict and returns a constant
#[derive(Debug)]
struct RecordingRegressor {
    width: usize,
    output: f64,
    rows: RefCell<Vec<Vec<f64>>>,
}

impl RecordingRegressor {
    fn new(width: usize, output: f64) -> Self {
        Self {
            width,
            output,
            rows: RefCell::new(Vec::new()),
        }
    }
}

impl Regressor for RecordingRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        self.rows.borrow_mut().push(features.to_vec());
        Ok(self.output)
    }

    fn name(&self) -> &str {
        "Recording"
    }

    fn n_features(&self) -> usize {
        self.width
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Fails on a given call
#[derive(Debug)]
struct FailingRegressor {
    fail_at: usize,
    calls: RefCell<usize>,
    output: f64,
}

impl Regressor for FailingRegressor {
    fn predict(&self, _features: &[f64]) -> Result<f64> {
        *self.calls.borrow_mut() += 1;
        if *self.calls.borrow() == self.fail_at {
            return Err(ForecastError::ModelError("prediction failed".to_string()));
        }
        Ok(self.output)
    }

    fn name(&self) -> &str {
        "Failing"
    }

    fn n_features(&self) -> usize {
        DEFAULT_FEATURE_NAMES.len()
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Noise that always pushes hard downwards
struct AdversarialNoise;

impl NoiseSource for AdversarialNoise {
    fn sample(&mut self) -> f64 {
        -1000.0
    }
}

#[test]
fn test_forecast_has_72_hourly_points_after_latest() {
    let model = create_lag_model();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence).unwrap();
    let latest = create_latest();

    let forecast = forecaster.forecast(&latest, &mut NoNoise).unwrap();

    assert_eq!(forecast.len(), FORECAST_HORIZON_HOURS);
    assert_eq!(forecast.seeded_at, latest.datetime);
    assert_eq!(
        forecast.points[0].forecast_time,
        latest.datetime + Duration::hours(1)
    );
    for pair in forecast.points.windows(2) {
        assert_eq!(
            pair[1].forecast_time - pair[0].forecast_time,
            Duration::hours(1)
        );
    }
}

#[test]
fn test_prediction_feeds_back_as_aqi_lag() {
    let model = create_lag_model();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence).unwrap();

    let forecast = forecaster.forecast(&create_latest(), &mut NoNoise).unwrap();

    // 0.4 + 0.9 * 3.0 = 3.1, then 0.4 + 0.9 * 3.1 = 3.19
    assert_approx_eq!(forecast.points[0].predicted_aqi, 3.1);
    assert_approx_eq!(forecast.points[1].predicted_aqi, 3.19);
    // Converges towards the fixed point 4.0
    assert!(forecast.points[71].predicted_aqi <= 4.0);
    assert!(forecast.points[71].predicted_aqi > 3.9);
}

#[test]
fn test_every_row_follows_trained_order() {
    let mut names = feature_names();
    names.reverse();
    let model = RecordingRegressor::new(names.len(), 2.5);
    let forecaster =
        RecursiveForecaster::new(&model, names.clone(), LagStrategy::Persistence).unwrap();
    let latest = create_latest();

    let forecast = forecaster.forecast(&latest, &mut NoNoise).unwrap();
    let rows = model.rows.borrow();
    assert_eq!(rows.len(), FORECAST_HORIZON_HOURS);

    let position = |name: &str| names.iter().position(|n| n == name).unwrap();
    for (step, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), names.len());

        let target = forecast.points[step].forecast_time;
        assert_eq!(row[position("hour")], f64::from(target.hour()));
        assert_eq!(row[position("o3")], latest.o3);
        assert_eq!(row[position("pm2_5_lag_1h")], latest.pm2_5);
        assert_eq!(row[position("aqi_change_rate")], 0.0);

        let expected_lag = if step == 0 { latest.aqi } else { 2.5 };
        assert_eq!(row[position("aqi_lag_1h")], expected_lag);
    }
}

#[test]
fn test_subset_schema_drops_extra_features() {
    let names = vec!["aqi_lag_1h".to_string(), "month".to_string()];
    let model = RecordingRegressor::new(2, 1.0);
    let forecaster =
        RecursiveForecaster::new(&model, names, LagStrategy::Persistence).unwrap();

    forecaster.forecast(&create_latest(), &mut NoNoise).unwrap();

    let rows = model.rows.borrow();
    assert_eq!(rows[0], vec![3.0, 1.0]);
    assert_eq!(rows[1], vec![1.0, 1.0]);
}

#[test]
fn test_persistence_is_deterministic() {
    let model = create_lag_model();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence).unwrap();
    let latest = create_latest();

    let first = forecaster.forecast(&latest, &mut NoNoise).unwrap();
    let second = forecaster.forecast(&latest, &mut NoNoise).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_decay_with_seed_is_reproducible() {
    let model = create_lag_model();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::decay()).unwrap();
    let latest = create_latest();

    let first = forecaster
        .forecast(&latest, &mut GaussianNoise::new(0.05, Some(42)).unwrap())
        .unwrap();
    let second = forecaster
        .forecast(&latest, &mut GaussianNoise::new(0.05, Some(42)).unwrap())
        .unwrap();

    assert_eq!(first.values(), second.values());
}

#[test]
fn test_decay_never_goes_negative() {
    let model = create_lag_model();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::decay()).unwrap();

    let forecast = forecaster
        .forecast(&create_latest(), &mut AdversarialNoise)
        .unwrap();

    assert_eq!(forecast.len(), FORECAST_HORIZON_HOURS);
    assert!(forecast.values().iter().all(|v| *v >= 0.0));
}

#[test]
fn test_decay_clamps_negative_model_output() {
    let model = LinearModel::new("Ridge", -50.0, vec![0.0; DEFAULT_FEATURE_NAMES.len()]).unwrap();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::decay()).unwrap();

    let forecast = forecaster.forecast(&create_latest(), &mut NoNoise).unwrap();

    assert!(forecast.values().iter().all(|v| *v == 0.0));
}

#[test]
fn test_decay_scales_carried_pollutants() {
    let names = feature_names();
    let model = RecordingRegressor::new(names.len(), 2.0);
    let forecaster =
        RecursiveForecaster::new(&model, names.clone(), LagStrategy::decay()).unwrap();
    let latest = create_latest();

    forecaster.forecast(&latest, &mut NoNoise).unwrap();
    let rows = model.rows.borrow();
    let position = |name: &str| names.iter().position(|n| n == name).unwrap();

    // Step 1 targets 14:00, an off-peak hour
    assert_approx_eq!(rows[0][position("pm2_5")], latest.pm2_5 * 0.992 * 0.95);
    assert_approx_eq!(rows[0][position("pm2_5_lag_1h")], latest.pm2_5);
    // Step 4 targets 17:00, a peak hour, and lags carry step 3's values
    assert_approx_eq!(
        rows[3][position("co")],
        latest.co * 0.992_f64.powi(4) * 1.15
    );
    assert_approx_eq!(
        rows[3][position("co_lag_1h")],
        latest.co * 0.992_f64.powi(3) * 0.95
    );
    // Unmodelled pollutants stay at the latest reading
    assert_eq!(rows[3][position("so2")], latest.so2);
    // Change rate is the difference of the two latest estimates
    assert_approx_eq!(rows[0][position("aqi_change_rate")], 0.0);
    assert_approx_eq!(rows[1][position("aqi_change_rate")], 2.0 - latest.aqi);
    assert_approx_eq!(rows[2][position("aqi_change_rate")], 0.0);
}

#[test]
fn test_decay_factor_stays_above_floor() {
    let names = feature_names();
    let model = RecordingRegressor::new(names.len(), 2.0);
    let forecaster =
        RecursiveForecaster::new(&model, names.clone(), LagStrategy::decay()).unwrap();
    let latest = create_latest();

    forecaster.forecast(&latest, &mut NoNoise).unwrap();
    let rows = model.rows.borrow();
    let no2 = names.iter().position(|n| n == "no2").unwrap();

    let min_factor = rows
        .iter()
        .map(|row| row[no2] / latest.no2)
        .fold(f64::MAX, f64::min);
    assert!(min_factor >= 0.30 * 0.95 - 1e-12);
}

#[test]
fn test_predictions_are_rounded() {
    let model =
        LinearModel::new("Ridge", 2.345_678, vec![0.0; DEFAULT_FEATURE_NAMES.len()]).unwrap();
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence).unwrap();

    let forecast = forecaster.forecast(&create_latest(), &mut NoNoise).unwrap();

    assert_eq!(forecast.points[0].predicted_aqi, 2.35);
}

#[test]
fn test_unknown_feature_is_schema_error() {
    let mut names = feature_names();
    names[0] = "wind_speed".to_string();
    let model = RecordingRegressor::new(names.len(), 1.0);
    let forecaster = RecursiveForecaster::new(&model, names, LagStrategy::Persistence).unwrap();

    let result = forecaster.forecast(&create_latest(), &mut NoNoise);

    match result {
        Err(ForecastError::SchemaError(message)) => assert!(message.contains("wind_speed")),
        other => panic!("Expected SchemaError, got {:?}", other),
    }
    assert!(model.rows.borrow().is_empty());
}

#[test]
fn test_duplicate_feature_name_is_rejected_up_front() {
    let mut names = feature_names();
    let co = names.iter().position(|n| n == "co").unwrap();
    names[co] = "hour".to_string();
    let model = RecordingRegressor::new(names.len(), 1.0);

    let result = RecursiveForecaster::new(&model, names, LagStrategy::Persistence);

    match result {
        Err(ForecastError::SchemaError(message)) => assert!(message.contains("hour")),
        other => panic!("Expected SchemaError, got {:?}", other.map(|_| ())),
    }
    assert!(model.rows.borrow().is_empty());
}

#[test]
fn test_width_mismatch_is_rejected_up_front() {
    let model = RecordingRegressor::new(3, 1.0);
    let result = RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence);
    assert!(matches!(result, Err(ForecastError::SchemaError(_))));

    let result = RecursiveForecaster::new(&model, Vec::new(), LagStrategy::Persistence);
    assert!(matches!(result, Err(ForecastError::SchemaError(_))));
}

#[test]
fn test_model_failure_aborts_forecast() {
    let model = FailingRegressor {
        fail_at: 5,
        calls: RefCell::new(0),
        output: 2.0,
    };
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence).unwrap();

    let result = forecaster.forecast(&create_latest(), &mut NoNoise);

    assert!(matches!(result, Err(ForecastError::ModelError(_))));
    assert_eq!(*model.calls.borrow(), 5);
}

#[test]
fn test_non_finite_prediction_aborts_forecast() {
    let model = RecordingRegressor::new(DEFAULT_FEATURE_NAMES.len(), f64::NAN);
    let forecaster =
        RecursiveForecaster::new(&model, feature_names(), LagStrategy::Persistence).unwrap();

    let result = forecaster.forecast(&create_latest(), &mut NoNoise);

    assert!(matches!(result, Err(ForecastError::ModelError(_))));
    assert_eq!(model.rows.borrow().len(), 1);
}
