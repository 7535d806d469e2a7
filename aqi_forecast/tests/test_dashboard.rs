use assert_approx_eq::assert_approx_eq;
use aqi_forecast::dashboard::{DashboardSummary, DashboardView, PollutantLevel};
use aqi_forecast::data::{FeatureStore, Observation};
use aqi_forecast::selection::CandidateSummary;
use aqi_forecast::data::parse_timestamp;
use aqi_forecast::forecaster::{Forecast, ForecastPoint};
use aqi_forecast::status::AqiStatus;
use aqi_forecast::writer::{ForecastWriter, ModelInfo};
use chrono::{Duration, NaiveDate, Utc};
use std::fs;
use tempfile::tempdir;

fn create_forecast(start: &str, values: &[f64]) -> Forecast {
    let seeded_at = parse_timestamp(start).unwrap();
    Forecast {
        seeded_at,
        points: values
            .iter()
            .enumerate()
            .map(|(i, v)| ForecastPoint {
                forecast_time: seeded_at + Duration::hours(i as i64 + 1),
                predicted_aqi: *v,
            })
            .collect(),
    }
}

fn create_info() -> ModelInfo {
    ModelInfo {
        model_name: "RandomForestRegressor".to_string(),
        model_version: 2,
        model_r2: Some(0.74),
        model_mae: Some(0.21),
        inference_time: Utc::now(),
        selection_criteria: None,
        degraded_selection: false,
        lag_strategy: None,
        models: Vec::new(),
    }
}

#[test]
fn test_missing_artifacts_are_unavailable() {
    let dir = tempdir().unwrap();

    let view = DashboardView::load(
        dir.path().join("f.csv"),
        dir.path().join("m.json"),
        dir.path().join("history.csv"),
    );

    assert!(matches!(view, DashboardView::Unavailable(_)));
}

#[test]
fn test_corrupt_forecast_is_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("f.csv");
    fs::write(&path, "forecast_time,predicted_aqi\nnot a time,abc\n").unwrap();

    let view = DashboardView::load(&path, dir.path().join("m.json"), dir.path().join("history.csv"));

    assert!(matches!(view, DashboardView::Unavailable(_)));
}

#[test]
fn test_summary_from_written_artifacts() {
    let dir = tempdir().unwrap();
    let writer = ForecastWriter::new(dir.path().join("f.csv"), dir.path().join("m.json"));
    let mut values = vec![1.2; 24];
    values.extend(vec![2.0; 24]);
    values.extend(vec![4.8; 24]);
    // Seeded at 23:00 so the horizon covers exactly three dates
    writer
        .write(&create_forecast("2025-01-14 23:00:00", &values), &create_info())
        .unwrap();

    let summary = match DashboardView::load(
        writer.forecast_path(),
        writer.model_info_path(),
        dir.path().join("history.csv"),
    ) {
        DashboardView::Available(summary) => summary,
        DashboardView::Unavailable(reason) => panic!("Unexpected unavailable: {}", reason),
    };

    assert_eq!(summary.total_hours, 72);
    assert_eq!(summary.current.predicted_aqi, 1.2);
    assert_eq!(summary.current_status, AqiStatus::Good);
    assert_eq!(summary.model.as_ref().map(|m| m.model_version), Some(2));

    assert_eq!(summary.outlook.len(), 3);
    assert_eq!(summary.outlook[0].date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    assert_approx_eq!(summary.outlook[1].mean_aqi, 2.0);
    assert_eq!(summary.outlook[2].status, AqiStatus::VeryPoor);

    assert_eq!(
        summary.breakdown,
        vec![
            (AqiStatus::Good, 24),
            (AqiStatus::Fair, 24),
            (AqiStatus::VeryPoor, 24)
        ]
    );
    assert_eq!(summary.hourly_pattern.len(), 24);
    assert_approx_eq!(summary.hourly_pattern[0].mean_aqi, (1.2 + 2.0 + 4.8) / 3.0);

    let text = summary.to_string();
    assert!(text.contains("Random Forest Regressor v2"));
    assert!(text.contains("Good"));
}

#[test]
fn test_missing_model_info_keeps_forecast() {
    let dir = tempdir().unwrap();
    let writer = ForecastWriter::new(dir.path().join("f.csv"), dir.path().join("m.json"));
    writer
        .write(&create_forecast("2025-01-14 12:00:00", &[3.0; 72]), &create_info())
        .unwrap();
    fs::remove_file(writer.model_info_path()).unwrap();

    match DashboardView::load(
        writer.forecast_path(),
        writer.model_info_path(),
        dir.path().join("history.csv"),
    ) {
        DashboardView::Available(summary) => {
            assert!(summary.model.is_none());
            assert_eq!(summary.current_status, AqiStatus::Moderate);
            // 13:00 start spans four dates; the partial first one is skipped
            assert_eq!(summary.outlook[0].date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
            assert!(summary.to_string().contains("Model: unknown"));
        }
        DashboardView::Unavailable(reason) => panic!("Unexpected unavailable: {}", reason),
    }
}

#[test]
fn test_summary_of_no_points_is_none() {
    assert!(DashboardSummary::from_points(Vec::new(), None).is_none());
}

fn create_observation(datetime: &str, pm2_5: f64) -> Observation {
    Observation {
        datetime: parse_timestamp(datetime).unwrap(),
        aqi: 3.0,
        co: 250.0,
        no2: 0.2,
        o3: 60.0,
        so2: 0.9,
        pm2_5,
        pm10: 20.0,
        nh3: 0.1,
    }
}

fn create_candidate(name: &str, version: u32, r2: f64, selected: bool) -> CandidateSummary {
    CandidateSummary {
        name: name.to_string(),
        version,
        mae: Some(0.3),
        r2: Some(r2),
        in_band: (0.60..=0.90).contains(&r2),
        selected,
    }
}

#[test]
fn test_pollutant_snapshot_uses_latest_reading() {
    let dir = tempdir().unwrap();
    let history = dir.path().join("history.csv");
    FeatureStore::new(&history)
        .write_all(&[
            create_observation("2025-01-14 21:00:00", 10.0),
            create_observation("2025-01-14 22:00:00", 45.0),
        ])
        .unwrap();
    let writer = ForecastWriter::new(dir.path().join("f.csv"), dir.path().join("m.json"));
    writer
        .write(&create_forecast("2025-01-14 22:00:00", &[2.0; 72]), &create_info())
        .unwrap();

    let summary = match DashboardView::load(writer.forecast_path(), writer.model_info_path(), &history) {
        DashboardView::Available(summary) => summary,
        DashboardView::Unavailable(reason) => panic!("Unexpected unavailable: {}", reason),
    };

    let snapshot = summary.pollutants.as_ref().unwrap();
    assert_eq!(snapshot.datetime, parse_timestamp("2025-01-14 22:00:00").unwrap());
    let names: Vec<&str> = snapshot.readings.iter().map(|r| r.pollutant).collect();
    assert_eq!(names, vec!["co", "no2", "o3", "so2", "pm2_5", "pm10", "nh3"]);

    let level = |name: &str| {
        snapshot
            .readings
            .iter()
            .find(|r| r.pollutant == name)
            .unwrap()
            .clone()
    };
    // Above the reference maximum is capped at 100%
    assert_approx_eq!(level("co").percent_of_reference, 100.0);
    assert_eq!(level("co").level, PollutantLevel::Severe);
    assert_approx_eq!(level("pm2_5").percent_of_reference, 60.0);
    assert_eq!(level("pm2_5").level, PollutantLevel::High);
    assert_approx_eq!(level("o3").percent_of_reference, 40.0);
    assert_eq!(level("o3").level, PollutantLevel::Elevated);
    assert_eq!(level("pm10").level, PollutantLevel::Low);

    assert!(summary.to_string().contains("Pollutant inputs (14 Jan 2025, 22:00):"));
}

#[test]
fn test_missing_history_leaves_out_pollutants() {
    let dir = tempdir().unwrap();
    let writer = ForecastWriter::new(dir.path().join("f.csv"), dir.path().join("m.json"));
    writer
        .write(&create_forecast("2025-01-14 22:00:00", &[2.0; 72]), &create_info())
        .unwrap();

    match DashboardView::load(
        writer.forecast_path(),
        writer.model_info_path(),
        dir.path().join("history.csv"),
    ) {
        DashboardView::Available(summary) => {
            assert!(summary.pollutants.is_none());
            assert!(!summary.to_string().contains("Pollutant inputs"));
        }
        DashboardView::Unavailable(reason) => panic!("Unexpected unavailable: {}", reason),
    }
}

#[test]
fn test_model_comparison_from_model_info() {
    let mut info = create_info();
    info.selection_criteria = Some("Best R² within 0.60 <= R² <= 0.90".to_string());
    info.models = vec![
        create_candidate("LinearRegression", 1, 0.55, false),
        create_candidate("RandomForestRegressor", 2, 0.74, true),
        create_candidate("Sequential", 3, 0.93, false),
    ];
    let forecast = create_forecast("2025-01-14 22:00:00", &[2.0; 72]);

    let summary = DashboardSummary::from_points(forecast.points, Some(info)).unwrap();

    let comparison = summary.comparison.as_ref().unwrap();
    assert_eq!(comparison.candidates.len(), 3);
    assert_eq!(comparison.selected().map(|c| c.version), Some(2));

    let text = summary.to_string();
    assert!(text.contains("Selection criteria: Best R² within 0.60 <= R² <= 0.90"));
    let selected_line = text.lines().find(|l| l.contains("SELECTED")).unwrap();
    assert!(selected_line.contains("Random Forest Regressor"));
    assert!(selected_line.contains("0.7400"));
    assert_eq!(text.lines().filter(|l| l.ends_with("candidate")).count(), 2);
}

#[test]
fn test_no_recorded_candidates_has_no_comparison() {
    let forecast = create_forecast("2025-01-14 22:00:00", &[2.0; 72]);

    let summary = DashboardSummary::from_points(forecast.points, Some(create_info())).unwrap();

    assert!(summary.comparison.is_none());
    assert!(!summary.to_string().contains("Model comparison"));
}
