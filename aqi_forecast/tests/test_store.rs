use aqi_forecast::data::{parse_timestamp, FeatureStore, Observation};
use aqi_forecast::error::ForecastError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn create_observation(datetime: &str, aqi: f64) -> Observation {
    Observation {
        datetime: parse_timestamp(datetime).unwrap(),
        aqi,
        co: 400.5,
        no2: 18.25,
        o3: 30.0,
        so2: 7.5,
        pm2_5: 55.0,
        pm10: 90.0,
        nh3: 3.5,
    }
}

#[test]
fn test_append_creates_store() {
    let dir = tempdir().unwrap();
    let store = FeatureStore::new(dir.path().join("history.csv"));

    let written = store
        .append(&create_observation("2025-01-15 13:00:00", 3.0))
        .unwrap();

    assert!(written);
    let observations = store.load_observations().unwrap();
    assert_eq!(observations, vec![create_observation("2025-01-15 13:00:00", 3.0)]);
}

#[test]
fn test_append_skips_existing_hours() {
    let dir = tempdir().unwrap();
    let store = FeatureStore::new(dir.path().join("history.csv"));

    assert!(store.append(&create_observation("2025-01-15 13:00:00", 3.0)).unwrap());
    assert!(store.append(&create_observation("2025-01-15 14:00:00", 4.0)).unwrap());
    // Same hour again, then an older one
    assert!(!store.append(&create_observation("2025-01-15 14:00:00", 5.0)).unwrap());
    assert!(!store.append(&create_observation("2025-01-15 12:00:00", 2.0)).unwrap());

    let observations = store.load_observations().unwrap();
    assert_eq!(observations.len(), 2);

    let latest = store.latest_observation().unwrap();
    assert_eq!(latest, create_observation("2025-01-15 14:00:00", 4.0));
}

#[test]
fn test_load_sorts_by_time() {
    let dir = tempdir().unwrap();
    let store = FeatureStore::new(dir.path().join("history.csv"));
    store
        .write_all(&[
            create_observation("2025-01-15 15:00:00", 4.0),
            create_observation("2025-01-15 13:00:00", 2.0),
            create_observation("2025-01-15 14:00:00", 3.0),
        ])
        .unwrap();

    let aqi: Vec<f64> = store
        .load_observations()
        .unwrap()
        .iter()
        .map(|o| o.aqi)
        .collect();
    assert_eq!(aqi, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_reads_integer_aqi_and_iso_timestamps() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "datetime,aqi,co,no2,o3,so2,pm2_5,pm10,nh3").unwrap();
    writeln!(file, "2025-01-15T13:00:00,3,400.5,18.25,30.0,7.5,55.0,90.0,3.5").unwrap();
    writeln!(file, "2025-01-15T14:00:00,4,410.0,19.0,31.0,7.0,56.0,91.0,3.4").unwrap();
    file.flush().unwrap();

    let store = FeatureStore::new(file.path());
    let latest = store.latest_observation().unwrap();

    assert_eq!(latest.datetime, parse_timestamp("2025-01-15 14:00:00").unwrap());
    assert_eq!(latest.aqi, 4.0);
    assert_eq!(latest.pollutant("pm10"), Some(91.0));
    assert_eq!(latest.pollutant("wind"), None);
}

#[test]
fn test_missing_value_is_data_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "datetime,aqi,co,no2,o3,so2,pm2_5,pm10,nh3").unwrap();
    writeln!(file, "2025-01-15 13:00:00,3.0,400.5,,30.0,7.5,55.0,90.0,3.5").unwrap();
    file.flush().unwrap();

    let result = FeatureStore::new(file.path()).load_observations();

    assert!(matches!(result, Err(ForecastError::DataError(_))));
}

#[test]
fn test_missing_store_is_io_error() {
    let dir = tempdir().unwrap();
    let store = FeatureStore::new(dir.path().join("absent.csv"));

    assert!(matches!(
        store.latest_observation(),
        Err(ForecastError::IoError(_))
    ));
}

#[test]
fn test_parse_timestamp_formats() {
    let expected = parse_timestamp("2025-01-15 13:00:00").unwrap();

    assert_eq!(parse_timestamp("2025-01-15T13:00:00").unwrap(), expected);
    assert_eq!(parse_timestamp("2025-01-15 13:00").unwrap(), expected);
    assert_eq!(parse_timestamp("2025-01-15 13:00:00.000").unwrap(), expected);
    assert_eq!(parse_timestamp("2025-01-15T13:00:00+05:00").unwrap(), expected);
    assert!(parse_timestamp("15/01/2025").is_err());
}
