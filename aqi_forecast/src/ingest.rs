//! OpenWeather air pollution ingestion
//!
//! Fetches current and historical readings and converts them into
//! [`Observation`]s in local wall-clock time. Transient failures are retried
//! with a linear backoff; anything else fails on the first attempt.

use crate::data::Observation;
use crate::error::{ForecastError, Result};
use backon::{BackoffBuilder, BlockingRetryable};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::cell::Cell;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base URL of the OpenWeather data API
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Request timeout for a single call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body of the air pollution endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionResponse {
    pub list: Vec<AirPollutionEntry>,
}

/// One hourly reading in a response
#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionEntry {
    /// Unix timestamp, seconds
    pub dt: i64,
    pub main: AirPollutionIndex,
    pub components: Components,
}

/// Index section of a reading
#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionIndex {
    pub aqi: f64,
}

/// Pollutant concentrations in μg/m³
#[derive(Debug, Clone, Deserialize)]
pub struct Components {
    pub co: f64,
    #[serde(default)]
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

impl AirPollutionEntry {
    /// Convert to an observation in the given local offset
    pub fn to_observation(&self, offset: FixedOffset) -> Result<Observation> {
        let datetime = local_time(self.dt, offset)?;
        Ok(Observation {
            datetime,
            aqi: self.main.aqi,
            co: self.components.co,
            no2: self.components.no2,
            o3: self.components.o3,
            so2: self.components.so2,
            pm2_5: self.components.pm2_5,
            pm10: self.components.pm10,
            nh3: self.components.nh3,
        })
    }
}

/// Convert a Unix timestamp to local wall-clock time
pub fn local_time(unix_seconds: i64, offset: FixedOffset) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(unix_seconds, 0)
        .map(|utc| utc.with_timezone(&offset).naive_local())
        .ok_or_else(|| {
            ForecastError::DataError(format!("Timestamp {} is out of range", unix_seconds))
        })
}

/// Build a fixed offset from whole hours east of UTC
pub fn utc_offset(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| {
        ForecastError::InvalidParameter(format!("UTC offset of {} hours is out of range", hours))
    })
}

/// Linear backoff schedule for transient failures
///
/// After failed attempt `n` the next one waits `n * base_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` calls in total
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ForecastError::InvalidParameter(
                "Retry policy needs at least one attempt".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
        })
    }

    /// Maximum number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let attempt = Cell::new(0u32);
        let max_attempts = self.max_attempts;

        (|| {
            attempt.set(attempt.get() + 1);
            op(attempt.get())
        })
        .retry(*self)
        .sleep(std::thread::sleep)
        .when(ForecastError::is_transient)
        .notify(|e: &ForecastError, delay: Duration| {
            warn!(
                attempt = attempt.get(),
                max_attempts,
                delay_secs = delay.as_secs(),
                error = %e,
                "Transient failure, will retry"
            );
        })
        .call()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffBuilder for RetryPolicy {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            policy: self,
            retries: 0,
        }
    }
}

/// Delays yielded by a [`RetryPolicy`], one per retry
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    policy: RetryPolicy,
    retries: u32,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retries + 1 >= self.policy.max_attempts {
            return None;
        }
        self.retries += 1;
        Some(self.policy.delay_after(self.retries))
    }
}

/// Blocking client for the OpenWeather air pollution API
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    token: String,
    offset: FixedOffset,
    retry: RetryPolicy,
}

impl OpenWeatherClient {
    /// Create a client for the given API key and local offset
    pub fn new(token: &str, offset: FixedOffset) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "OpenWeather API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ForecastError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: OPENWEATHER_BASE_URL.to_string(),
            token: token.to_string(),
            offset,
            retry: RetryPolicy::default(),
        })
    }

    /// Point the client at another server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch the current reading for a location
    pub fn current(&self, lat: f64, lon: f64) -> Result<Observation> {
        let url = format!("{}/air_pollution", self.base_url);
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.token.clone()),
        ];

        let response = self.retry.run(|attempt| {
            debug!(attempt, "Requesting current air pollution");
            self.fetch(&url, &query)
        })?;

        let entry = response.list.first().ok_or_else(|| {
            ForecastError::Network("Current air pollution response holds no readings".to_string())
        })?;
        let observation = entry.to_observation(self.offset)?;

        info!(datetime = %observation.datetime, aqi = observation.aqi, "Fetched current reading");
        Ok(observation)
    }

    /// Fetch hourly readings between two instants, sorted by time
    pub fn history(
        &self,
        lat: f64,
        lon: f64,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<Observation>> {
        if start >= end {
            return Err(ForecastError::InvalidParameter(format!(
                "History range start {} is not before end {}",
                start, end
            )));
        }

        let url = format!("{}/air_pollution/history", self.base_url);
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("appid", self.token.clone()),
        ];

        info!(%start, %end, "Fetching air pollution history");
        let response = self.retry.run(|attempt| {
            debug!(attempt, "Requesting air pollution history");
            self.fetch(&url, &query)
        })?;

        let mut observations = response
            .list
            .iter()
            .map(|entry| entry.to_observation(self.offset))
            .collect::<Result<Vec<_>>>()?;
        observations.sort_by_key(|o| o.datetime);

        info!(rows = observations.len(), "Fetched history");
        Ok(observations)
    }

    fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<AirPollutionResponse> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(classify_request_error)?;

        let status = response.status();
        let body = response.text().map_err(classify_request_error)?;
        check_status(status, &body)?;

        serde_json::from_str(&body)
            .map_err(|e| ForecastError::Network(format!("Malformed air pollution response: {}", e)))
    }
}

fn classify_request_error(err: reqwest::Error) -> ForecastError {
    if err.is_connect() || err.is_timeout() {
        ForecastError::TransientNetwork(err.to_string())
    } else {
        ForecastError::Network(err.to_string())
    }
}

/// Map an HTTP status to success, a retryable error, or a permanent one
pub fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(ForecastError::TransientNetwork(format!(
            "Request failed with status {}: {}",
            status, body
        )))
    } else {
        Err(ForecastError::Network(format!(
            "Request failed with status {}: {}",
            status, body
        )))
    }
}
