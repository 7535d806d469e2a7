//! Ingest and backfill commands - pull readings from OpenWeather into the store.

use anyhow::{anyhow, Context, Result};
use aqi_forecast::config::Settings;
use aqi_forecast::data::FeatureStore;
use aqi_forecast::ingest::{utc_offset, OpenWeatherClient};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use tracing::info;

fn client(settings: &Settings) -> Result<OpenWeatherClient> {
    let token = settings
        .openweather_token
        .as_deref()
        .ok_or_else(|| anyhow!("OPENWEATHER_TOKEN is not set"))?;
    let offset = utc_offset(settings.utc_offset_hours)?;
    Ok(OpenWeatherClient::new(token, offset)?)
}

/// Fetches the current reading and appends it when it is new.
///
/// # Errors
///
/// Returns an error if the request fails after retries or the store cannot
/// be written.
pub fn run_current(settings: &Settings) -> Result<()> {
    let client = client(settings)?;
    let observation = client
        .current(settings.lat, settings.lon)
        .context("Failed to fetch current air pollution")?;

    let store = FeatureStore::new(settings.history_path());
    if store.append(&observation)? {
        info!(datetime = %observation.datetime, "Stored new reading");
    } else {
        info!(datetime = %observation.datetime, "Reading already stored");
    }
    Ok(())
}

/// Fetches every hour between two local dates and replaces the store.
///
/// # Errors
///
/// Returns an error if the dates are invalid, the request fails after
/// retries, or the store cannot be written.
pub fn run_backfill(settings: &Settings, start: &str, end: &str) -> Result<()> {
    let offset = utc_offset(settings.utc_offset_hours)?;
    let start = local_instant(start, NaiveTime::MIN, offset)?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(|| anyhow!("Invalid time"))?;
    let end = local_instant(end, end_of_day, offset)?;

    let client = client(settings)?;
    let observations = client
        .history(settings.lat, settings.lon, start, end)
        .context("Failed to fetch air pollution history")?;

    let store = FeatureStore::new(settings.history_path());
    store.write_all(&observations)?;

    info!(
        rows = observations.len(),
        path = %store.path().display(),
        "Backfill complete"
    );
    Ok(())
}

fn local_instant(date: &str, time: NaiveTime, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| anyhow!("Ambiguous local time {} {}", date, time))
}
