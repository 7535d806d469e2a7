//! Hourly observation data and the file-backed feature record store

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp layout used in every CSV artifact
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pollutant column names in store order
pub const POLLUTANT_COLUMNS: [&str; 7] = ["co", "no2", "o3", "so2", "pm2_5", "pm10", "nh3"];

/// A single hourly air quality reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Local wall-clock time of the reading
    #[serde(with = "naive_timestamp")]
    pub datetime: NaiveDateTime,
    /// Air quality index (1-5 scale)
    pub aqi: f64,
    /// Carbon monoxide
    pub co: f64,
    /// Nitrogen dioxide
    pub no2: f64,
    /// Ozone
    pub o3: f64,
    /// Sulphur dioxide
    pub so2: f64,
    /// Fine particulates
    pub pm2_5: f64,
    /// Coarse particulates
    pub pm10: f64,
    /// Ammonia
    pub nh3: f64,
}

impl Observation {
    /// Concentration of a pollutant by column name
    pub fn pollutant(&self, name: &str) -> Option<f64> {
        match name {
            "co" => Some(self.co),
            "no2" => Some(self.no2),
            "o3" => Some(self.o3),
            "so2" => Some(self.so2),
            "pm2_5" => Some(self.pm2_5),
            "pm10" => Some(self.pm10),
            "nh3" => Some(self.nh3),
            _ => None,
        }
    }
}

/// Parse a timestamp as written by this crate, pandas, or an ISO-8601 producer
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    const FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .map_err(|_| ForecastError::DataError(format!("Unrecognised timestamp '{}'", value)))
}

pub(crate) mod naive_timestamp {
    use super::{parse_timestamp, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(de::Error::custom)
    }
}

/// File-backed, append-only store of hourly observations
#[derive(Debug, Clone)]
pub struct FeatureStore {
    /// Path of the history CSV
    path: PathBuf,
}

impl FeatureStore {
    /// Create a store over the CSV file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every observation, sorted by time
    pub fn load_observations(&self) -> Result<Vec<Observation>> {
        let file = File::open(&self.path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let mut observations = observations_from_dataframe(&df)?;
        observations.sort_by_key(|o| o.datetime);

        debug!(
            path = %self.path.display(),
            rows = observations.len(),
            "Loaded observations"
        );

        Ok(observations)
    }

    /// The most recent observation in the store
    pub fn latest_observation(&self) -> Result<Observation> {
        self.load_observations()?.pop().ok_or_else(|| {
            ForecastError::DataError(format!(
                "Feature store {} holds no observations",
                self.path.display()
            ))
        })
    }

    /// Append an observation if it is newer than the latest stored one.
    ///
    /// Returns `false` when the hour is already present.
    pub fn append(&self, observation: &Observation) -> Result<bool> {
        if !self.path.exists() {
            self.write_all(std::slice::from_ref(observation))?;
            return Ok(true);
        }

        if let Some(latest) = self.load_observations()?.last() {
            if observation.datetime <= latest.datetime {
                info!(
                    datetime = %observation.datetime,
                    latest = %latest.datetime,
                    "Observation already stored, skipping"
                );
                return Ok(false);
            }
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(observation)?;
        writer.flush()?;

        info!(datetime = %observation.datetime, aqi = observation.aqi, "Appended observation");
        Ok(true)
    }

    /// Replace the store contents with `observations`
    pub fn write_all(&self, observations: &[Observation]) -> Result<()> {
        let dir = parent_dir(&self.path);
        std::fs::create_dir_all(dir)?;

        let staged = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(staged.as_file());
            if observations.is_empty() {
                writer.write_record(header())?;
            }
            for observation in observations {
                writer.serialize(observation)?;
            }
            writer.flush()?;
        }
        staged.persist(&self.path)?;

        info!(
            path = %self.path.display(),
            rows = observations.len(),
            "Wrote feature store"
        );
        Ok(())
    }
}

fn header() -> Vec<&'static str> {
    let mut columns = vec!["datetime", "aqi"];
    columns.extend(POLLUTANT_COLUMNS);
    columns
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Convert a store DataFrame into observations
fn observations_from_dataframe(df: &DataFrame) -> Result<Vec<Observation>> {
    let timestamps = column_as_timestamps(df, "datetime")?;
    let aqi = column_as_f64(df, "aqi")?;
    let mut pollutants = Vec::with_capacity(POLLUTANT_COLUMNS.len());
    for name in POLLUTANT_COLUMNS {
        pollutants.push(column_as_f64(df, name)?);
    }

    let observations = timestamps
        .into_iter()
        .enumerate()
        .map(|(row, datetime)| Observation {
            datetime,
            aqi: aqi[row],
            co: pollutants[0][row],
            no2: pollutants[1][row],
            o3: pollutants[2][row],
            so2: pollutants[3][row],
            pm2_5: pollutants[4][row],
            pm10: pollutants[5][row],
            nh3: pollutants[6][row],
        })
        .collect();

    Ok(observations)
}

/// Helper to get a numeric column as f64 values, rejecting gaps
pub(crate) fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
    let col = df.column(column_name).map_err(|e| {
        ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
    })?;

    let casted = col.cast(&DataType::Float64).map_err(|e| {
        ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64: {}",
            column_name, e
        ))
    })?;

    casted
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Missing value in column '{}' at row {}",
                    column_name, row
                ))
            })
        })
        .collect()
}

/// Helper to get a column of timestamp strings as parsed values
pub(crate) fn column_as_timestamps(df: &DataFrame, column_name: &str) -> Result<Vec<NaiveDateTime>> {
    let col = df.column(column_name).map_err(|e| {
        ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
    })?;
    let casted = col.cast(&DataType::Utf8)?;

    casted
        .utf8()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(raw) => parse_timestamp(raw),
            None => Err(ForecastError::DataError(format!(
                "Missing value in column '{}' at row {}",
                column_name, row
            ))),
        })
        .collect()
}
