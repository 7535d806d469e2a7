//! Pollutant decay and traffic curves
//!
//! Used by the decay forecasting variant to evolve carried pollutant
//! concentrations over the forecast horizon:
//! - `PollutantDecay`: geometric per-hour reduction with a floor
//! - `TrafficProfile`: multiplier that boosts rush hours and damps the rest

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Per-hour geometric decay of a pollutant concentration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantDecay {
    /// Fractional reduction per elapsed hour (0.008 = 0.8%)
    rate: f64,
    /// Lowest fraction of the original value the decay can reach
    floor: f64,
}

impl PollutantDecay {
    /// Create a new decay curve
    pub fn new(rate: f64, floor: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(MathError::InvalidInput(format!(
                "Decay rate must be in [0, 1), got {}",
                rate
            )));
        }
        if !(0.0..=1.0).contains(&floor) {
            return Err(MathError::InvalidInput(format!(
                "Decay floor must be in [0, 1], got {}",
                floor
            )));
        }

        Ok(Self { rate, floor })
    }

    /// Fractional reduction per hour
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Floor as a fraction of the original value
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Multiplicative factor after `hours` elapsed hours
    pub fn factor(&self, hours: u32) -> f64 {
        let exponent = i32::try_from(hours).unwrap_or(i32::MAX);
        (1.0 - self.rate).powi(exponent).max(self.floor)
    }

    /// Apply the decay to an original concentration
    pub fn apply(&self, original: f64, hours: u32) -> f64 {
        original * self.factor(hours)
    }
}

impl Default for PollutantDecay {
    fn default() -> Self {
        Self {
            rate: 0.008,
            floor: 0.30,
        }
    }
}

/// Hour-of-day multiplier modelling traffic emissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficProfile {
    /// Inclusive hour ranges treated as peak traffic
    peak_windows: Vec<(u32, u32)>,
    /// Multiplier applied during peak hours
    peak_multiplier: f64,
    /// Multiplier applied outside peak hours
    off_peak_multiplier: f64,
}

impl TrafficProfile {
    /// Create a new traffic profile
    pub fn new(
        peak_windows: Vec<(u32, u32)>,
        peak_multiplier: f64,
        off_peak_multiplier: f64,
    ) -> Result<Self> {
        if let Some(&(start, end)) = peak_windows
            .iter()
            .find(|(start, end)| start > end || *end > 23)
        {
            return Err(MathError::InvalidInput(format!(
                "Invalid peak window {}..={}",
                start, end
            )));
        }
        if peak_multiplier <= 0.0 || off_peak_multiplier <= 0.0 {
            return Err(MathError::InvalidInput(
                "Traffic multipliers must be positive".to_string(),
            ));
        }

        Ok(Self {
            peak_windows,
            peak_multiplier,
            off_peak_multiplier,
        })
    }

    /// Whether the hour of day falls in a peak window
    pub fn is_peak(&self, hour: u32) -> bool {
        self.peak_windows
            .iter()
            .any(|&(start, end)| (start..=end).contains(&hour))
    }

    /// Multiplier for the hour of day
    pub fn multiplier(&self, hour: u32) -> f64 {
        if self.is_peak(hour) {
            self.peak_multiplier
        } else {
            self.off_peak_multiplier
        }
    }
}

impl Default for TrafficProfile {
    /// Morning and evening rush: 07:00-09:00 and 17:00-19:00
    fn default() -> Self {
        Self {
            peak_windows: vec![(7, 9), (17, 19)],
            peak_multiplier: 1.15,
            off_peak_multiplier: 0.95,
        }
    }
}
