//! Read-only summary of the published forecast artifacts
//!
//! The dashboard never fails: a missing or unreadable forecast file yields
//! [`DashboardView::Unavailable`]. A missing model info file leaves the
//! model panels empty and a missing history leaves out the pollutant panel.

use crate::data::{column_as_f64, column_as_timestamps, FeatureStore, Observation};
use crate::error::Result;
use crate::forecaster::ForecastPoint;
use crate::selection::CandidateSummary;
use crate::status::AqiStatus;
use crate::writer::ModelInfo;
use aqi_math::stats::mean;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Number of days shown in the outlook
pub const OUTLOOK_DAYS: usize = 3;

/// Reference maxima per pollutant; readings are shown as a share of these
pub const POLLUTANT_REFERENCE_MAX: [(&str, f64); 7] = [
    ("co", 200.0),
    ("no2", 0.5),
    ("o3", 150.0),
    ("so2", 1.0),
    ("pm2_5", 75.0),
    ("pm10", 200.0),
    ("nh3", 0.5),
];

/// Mean AQI for one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyOutlook {
    pub date: NaiveDate,
    pub mean_aqi: f64,
    pub status: AqiStatus,
}

/// Mean AQI for one hour of the day across the horizon
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyMean {
    pub hour: u32,
    pub mean_aqi: f64,
}

/// Band of a reading relative to its reference maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PollutantLevel {
    /// Below 25%
    Low,
    /// 25% up to 50%
    Elevated,
    /// 50% up to 75%
    High,
    /// 75% and above
    Severe,
}

impl PollutantLevel {
    /// Band for a percentage of the reference maximum
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 75.0 {
            PollutantLevel::Severe
        } else if percent >= 50.0 {
            PollutantLevel::High
        } else if percent >= 25.0 {
            PollutantLevel::Elevated
        } else {
            PollutantLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PollutantLevel::Low => "low",
            PollutantLevel::Elevated => "elevated",
            PollutantLevel::High => "high",
            PollutantLevel::Severe => "severe",
        }
    }
}

/// One pollutant of the latest observation
#[derive(Debug, Clone, PartialEq)]
pub struct PollutantReading {
    pub pollutant: &'static str,
    pub value: f64,
    /// Share of the reference maximum, capped at 100
    pub percent_of_reference: f64,
    pub level: PollutantLevel,
}

/// Latest pollutant readings that feed the model
#[derive(Debug, Clone, PartialEq)]
pub struct PollutantSnapshot {
    pub datetime: NaiveDateTime,
    pub readings: Vec<PollutantReading>,
}

impl PollutantSnapshot {
    /// Score every pollutant of an observation against its reference maximum
    pub fn from_observation(observation: &Observation) -> Self {
        let readings = POLLUTANT_REFERENCE_MAX
            .iter()
            .map(|&(pollutant, reference)| {
                let value = observation.pollutant(pollutant).unwrap_or(0.0);
                let percent_of_reference = if reference > 0.0 {
                    (value / reference * 100.0).min(100.0)
                } else {
                    0.0
                };
                PollutantReading {
                    pollutant,
                    value,
                    percent_of_reference,
                    level: PollutantLevel::from_percent(percent_of_reference),
                }
            })
            .collect();

        Self {
            datetime: observation.datetime,
            readings,
        }
    }
}

/// Registry candidates considered by the last run
#[derive(Debug, Clone, PartialEq)]
pub struct ModelComparison {
    pub selection_criteria: Option<String>,
    pub candidates: Vec<CandidateSummary>,
}

impl ModelComparison {
    /// Comparison from model info; `None` when no candidates were recorded
    pub fn from_model_info(info: &ModelInfo) -> Option<Self> {
        if info.models.is_empty() {
            return None;
        }
        Some(Self {
            selection_criteria: info.selection_criteria.clone(),
            candidates: info.models.clone(),
        })
    }

    /// The candidate marked as selected
    pub fn selected(&self) -> Option<&CandidateSummary> {
        self.candidates.iter().find(|c| c.selected)
    }
}

/// Everything the dashboard displays
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    /// First forecast hour
    pub current: ForecastPoint,
    /// Category of the first forecast hour
    pub current_status: AqiStatus,
    /// Model metadata, when the info file was readable
    pub model: Option<ModelInfo>,
    /// Daily means for the coming days
    pub outlook: Vec<DailyOutlook>,
    /// Number of forecast hours per category, cleanest first
    pub breakdown: Vec<(AqiStatus, usize)>,
    /// Mean AQI per hour of day, ascending by hour
    pub hourly_pattern: Vec<HourlyMean>,
    /// Total forecast hours
    pub total_hours: usize,
    /// Latest pollutant inputs, when the history was readable
    pub pollutants: Option<PollutantSnapshot>,
    /// Candidates of the last selection, when recorded
    pub comparison: Option<ModelComparison>,
}

/// Outcome of loading the dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Available(DashboardSummary),
    Unavailable(String),
}

impl DashboardView {
    /// Load the artifacts written by the pipeline plus the observation history
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>, H: AsRef<Path>>(
        forecast_path: P,
        model_info_path: Q,
        history_path: H,
    ) -> Self {
        let forecast_path = forecast_path.as_ref();
        let points = match read_forecast(forecast_path) {
            Ok(points) => points,
            Err(e) => {
                warn!(path = %forecast_path.display(), error = %e, "Forecast unavailable");
                return DashboardView::Unavailable(format!(
                    "Forecast data not available ({}). Run the forecast pipeline first.",
                    e
                ));
            }
        };

        let model = match read_model_info(model_info_path.as_ref()) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "Model info unavailable");
                None
            }
        };

        let pollutants = match FeatureStore::new(history_path.as_ref()).latest_observation() {
            Ok(latest) => Some(PollutantSnapshot::from_observation(&latest)),
            Err(e) => {
                warn!(error = %e, "Pollutant history unavailable");
                None
            }
        };

        match DashboardSummary::from_points(points, model) {
            Some(summary) => DashboardView::Available(summary.with_pollutants(pollutants)),
            None => DashboardView::Unavailable("Forecast file holds no rows".to_string()),
        }
    }
}

impl DashboardSummary {
    /// Summarise forecast points; `None` when there are none
    pub fn from_points(mut points: Vec<ForecastPoint>, model: Option<ModelInfo>) -> Option<Self> {
        points.sort_by_key(|p| p.forecast_time);
        let current = points.first()?.clone();

        let summary = Self {
            comparison: model.as_ref().and_then(ModelComparison::from_model_info),
            pollutants: None,
            current_status: AqiStatus::from_value(current.predicted_aqi),
            outlook: daily_outlook(&points),
            breakdown: category_breakdown(&points),
            hourly_pattern: hourly_pattern(&points),
            total_hours: points.len(),
            current,
            model,
        };
        debug!(hours = summary.total_hours, "Built dashboard summary");
        Some(summary)
    }

    /// Attach the latest pollutant readings
    pub fn with_pollutants(mut self, pollutants: Option<PollutantSnapshot>) -> Self {
        self.pollutants = pollutants;
        self
    }
}

/// Daily means for up to [`OUTLOOK_DAYS`] days.
///
/// A 72-hour horizon that starts mid-day spans four dates; the partial
/// first date is then skipped.
pub fn daily_outlook(points: &[ForecastPoint]) -> Vec<DailyOutlook> {
    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for point in points {
        by_date
            .entry(point.forecast_time.date())
            .or_default()
            .push(point.predicted_aqi);
    }

    let skip = usize::from(by_date.len() > OUTLOOK_DAYS);
    by_date
        .into_iter()
        .skip(skip)
        .take(OUTLOOK_DAYS)
        .filter_map(|(date, values)| {
            let mean_aqi = mean(&values).ok()?;
            Some(DailyOutlook {
                date,
                mean_aqi,
                status: AqiStatus::from_value(mean_aqi),
            })
        })
        .collect()
}

/// Count forecast hours in each category, omitting empty ones
pub fn category_breakdown(points: &[ForecastPoint]) -> Vec<(AqiStatus, usize)> {
    let mut counts: BTreeMap<AqiStatus, usize> = BTreeMap::new();
    for point in points {
        *counts.entry(AqiStatus::from_value(point.predicted_aqi)).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Mean AQI for each hour of the day present in the forecast
pub fn hourly_pattern(points: &[ForecastPoint]) -> Vec<HourlyMean> {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for point in points {
        by_hour
            .entry(point.forecast_time.hour())
            .or_default()
            .push(point.predicted_aqi);
    }

    by_hour
        .into_iter()
        .filter_map(|(hour, values)| {
            mean(&values).ok().map(|mean_aqi| HourlyMean { hour, mean_aqi })
        })
        .collect()
}

/// Split a CamelCase algorithm name into words
pub fn display_model_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if let Some(p) = prev {
            if c.is_uppercase() && p.is_lowercase() {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn format_score(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn read_forecast(path: &Path) -> Result<Vec<ForecastPoint>> {
    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;

    let times = column_as_timestamps(&df, "forecast_time")?;
    let values = column_as_f64(&df, "predicted_aqi")?;

    Ok(times
        .into_iter()
        .zip(values)
        .map(|(forecast_time, predicted_aqi)| ForecastPoint {
            forecast_time,
            predicted_aqi,
        })
        .collect())
}

fn read_model_info(path: &Path) -> Result<ModelInfo> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Current AQI: {:.1} ({}) at {}",
            self.current.predicted_aqi,
            self.current_status,
            self.current.forecast_time.format(crate::data::TIMESTAMP_FORMAT)
        )?;
        writeln!(f, "  {}", self.current_status.advice())?;

        match &self.model {
            Some(info) => {
                write!(
                    f,
                    "Model: {} v{}",
                    display_model_name(&info.model_name),
                    info.model_version
                )?;
                if let Some(r2) = info.model_r2 {
                    write!(f, " (R² {:.3})", r2)?;
                }
                if info.degraded_selection {
                    write!(f, " [outside acceptance band]")?;
                }
                writeln!(f)?;
            }
            None => writeln!(f, "Model: unknown")?,
        }

        writeln!(f, "Outlook:")?;
        for day in &self.outlook {
            writeln!(
                f,
                "  {}  {:.1}  {}",
                day.date.format("%a %d %b"),
                day.mean_aqi,
                day.status
            )?;
        }

        writeln!(f, "Category breakdown ({} hours):", self.total_hours)?;
        for (status, count) in &self.breakdown {
            writeln!(f, "  {:<10} {:>3}", status.label(), count)?;
        }

        writeln!(f, "Hourly pattern:")?;
        for hour in &self.hourly_pattern {
            writeln!(f, "  {:02}:00  {:.2}", hour.hour, hour.mean_aqi)?;
        }

        if let Some(snapshot) = &self.pollutants {
            writeln!(
                f,
                "Pollutant inputs ({}):",
                snapshot.datetime.format("%d %b %Y, %H:%M")
            )?;
            for reading in &snapshot.readings {
                writeln!(
                    f,
                    "  {:<6} {:>9.2}  {:>5.1}%  {}",
                    reading.pollutant,
                    reading.value,
                    reading.percent_of_reference,
                    reading.level.label()
                )?;
            }
        }

        if let Some(comparison) = &self.comparison {
            writeln!(f, "Model comparison:")?;
            if let Some(criteria) = &comparison.selection_criteria {
                writeln!(f, "  Selection criteria: {}", criteria)?;
            }
            for candidate in &comparison.candidates {
                writeln!(
                    f,
                    "  {:<28} v{:<3} MAE {:>7}  R² {:>7}  {}",
                    display_model_name(&candidate.name),
                    candidate.version,
                    format_score(candidate.mae),
                    format_score(candidate.r2),
                    if candidate.selected { "SELECTED" } else { "candidate" }
                )?;
            }
        }
        Ok(())
    }
}
