//! Feature rows and the trained feature schema
//!
//! A [`FeatureRow`] keeps its values in insertion order. Models consume
//! plain `&[f64]` slices, so every row must be reordered against the
//! [`FeatureView`] the model was trained on before it is handed over.

use crate::data::{naive_timestamp, Observation};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Column holding the event time in the feature view
pub const TIME_COLUMN: &str = "datetime";

/// Label column in the feature view
pub const LABEL_COLUMN: &str = "aqi";

/// Feature names in the order the feature pipeline declares them
pub const DEFAULT_FEATURE_NAMES: [&str; 15] = [
    "co",
    "no2",
    "o3",
    "so2",
    "pm2_5",
    "pm10",
    "nh3",
    "hour",
    "day_of_week",
    "month",
    "aqi_lag_1h",
    "pm2_5_lag_1h",
    "co_lag_1h",
    "no2_lag_1h",
    "aqi_change_rate",
];

/// Named feature values in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    entries: Vec<(String, f64)>,
}

impl FeatureRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing an earlier value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style variant of [`FeatureRow::insert`]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    /// Feature names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of features in the row
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the row has no features
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select values in exactly the order of `schema`.
    ///
    /// Features not named by the schema are dropped; a schema name
    /// missing from the row is a schema error.
    pub fn reorder(&self, schema: &[String]) -> Result<Vec<f64>> {
        let missing: Vec<&str> = schema
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::SchemaError(format!(
                "Feature row is missing trained features: {}",
                missing.join(", ")
            )));
        }

        Ok(schema
            .iter()
            .filter_map(|name| self.get(name))
            .collect())
    }
}

/// Schema of the feature table a model was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureView {
    /// Feature view name
    pub name: String,
    /// Feature view version
    pub version: u32,
    /// Every column of the view, in declared order
    pub features: Vec<String>,
    /// Label column
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_label() -> String {
    LABEL_COLUMN.to_string()
}

impl FeatureView {
    /// Feature view matching the columns produced by [`training_rows`]
    pub fn standard(name: &str, version: u32) -> Self {
        let mut features = vec![TIME_COLUMN.to_string(), LABEL_COLUMN.to_string()];
        features.extend(DEFAULT_FEATURE_NAMES.iter().map(|f| f.to_string()));

        Self {
            name: name.to_string(),
            version,
            features,
            label: default_label(),
        }
    }

    /// Load a feature view definition from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let view: FeatureView = serde_json::from_str(&raw)?;
        view.training_feature_names()?;
        Ok(view)
    }

    /// Write the definition as pretty JSON
    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::create_dir_all(crate::data::parent_dir(path))?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Names the model was trained on: every column except time and label
    pub fn training_feature_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .features
            .iter()
            .filter(|name| name.as_str() != TIME_COLUMN && **name != self.label)
            .cloned()
            .collect();

        if names.is_empty() {
            return Err(ForecastError::SchemaError(format!(
                "Feature view '{}' declares no training features",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ForecastError::SchemaError(format!(
                "Feature view '{}' declares '{}' more than once",
                self.name, duplicate
            )));
        }

        Ok(names)
    }
}

/// Calendar features for an hour: hour of day, weekday (Monday = 0), month
pub fn calendar_features(time: NaiveDateTime) -> (f64, f64, f64) {
    (
        f64::from(time.hour()),
        f64::from(time.weekday().num_days_from_monday()),
        f64::from(time.month()),
    )
}

/// One row of the engineered training table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRow {
    #[serde(with = "naive_timestamp")]
    pub datetime: NaiveDateTime,
    pub aqi: f64,
    pub co: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
    pub hour: u32,
    pub day_of_week: u32,
    pub month: u32,
    pub aqi_lag_1h: f64,
    pub pm2_5_lag_1h: f64,
    pub co_lag_1h: f64,
    pub no2_lag_1h: f64,
    pub aqi_change_rate: f64,
}

impl TrainingRow {
    /// The row's features, inserted in table order
    pub fn feature_row(&self) -> FeatureRow {
        FeatureRow::new()
            .with("co", self.co)
            .with("no2", self.no2)
            .with("o3", self.o3)
            .with("so2", self.so2)
            .with("pm2_5", self.pm2_5)
            .with("pm10", self.pm10)
            .with("nh3", self.nh3)
            .with("hour", f64::from(self.hour))
            .with("day_of_week", f64::from(self.day_of_week))
            .with("month", f64::from(self.month))
            .with("aqi_lag_1h", self.aqi_lag_1h)
            .with("pm2_5_lag_1h", self.pm2_5_lag_1h)
            .with("co_lag_1h", self.co_lag_1h)
            .with("no2_lag_1h", self.no2_lag_1h)
            .with("aqi_change_rate", self.aqi_change_rate)
    }
}

/// Engineer the training table from time-sorted observations.
///
/// Lags come from the previous row and the change rate is
/// `aqi[t-1] - aqi[t-2]`, so the first two observations produce no row.
pub fn training_rows(observations: &[Observation]) -> Vec<TrainingRow> {
    observations
        .windows(3)
        .map(|window| {
            let (before, previous, current) = (&window[0], &window[1], &window[2]);
            let time = current.datetime;

            TrainingRow {
                datetime: time,
                aqi: current.aqi,
                co: current.co,
                no2: current.no2,
                o3: current.o3,
                so2: current.so2,
                pm2_5: current.pm2_5,
                pm10: current.pm10,
                nh3: current.nh3,
                hour: time.hour(),
                day_of_week: time.weekday().num_days_from_monday(),
                month: time.month(),
                aqi_lag_1h: previous.aqi,
                pm2_5_lag_1h: previous.pm2_5,
                co_lag_1h: previous.co,
                no2_lag_1h: previous.no2,
                aqi_change_rate: previous.aqi - before.aqi,
            }
        })
        .collect()
}

/// Write engineered training rows as CSV
pub fn write_training_rows<P: AsRef<Path>>(path: P, rows: &[TrainingRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
