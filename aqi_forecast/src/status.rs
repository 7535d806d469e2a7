//! AQI status categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health category of an AQI value on the 1-5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiStatus {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
}

impl AqiStatus {
    /// Every category, cleanest first
    pub const ALL: [AqiStatus; 5] = [
        AqiStatus::Good,
        AqiStatus::Fair,
        AqiStatus::Moderate,
        AqiStatus::Poor,
        AqiStatus::VeryPoor,
    ];

    /// Classify a value. Each upper bound belongs to the lower category.
    pub fn from_value(aqi: f64) -> Self {
        if aqi <= 1.5 {
            AqiStatus::Good
        } else if aqi <= 2.5 {
            AqiStatus::Fair
        } else if aqi <= 3.5 {
            AqiStatus::Moderate
        } else if aqi <= 4.5 {
            AqiStatus::Poor
        } else {
            AqiStatus::VeryPoor
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            AqiStatus::Good => "Good",
            AqiStatus::Fair => "Fair",
            AqiStatus::Moderate => "Moderate",
            AqiStatus::Poor => "Poor",
            AqiStatus::VeryPoor => "Very Poor",
        }
    }

    /// Display colour as a hex string
    pub fn color(self) -> &'static str {
        match self {
            AqiStatus::Good => "#24A148",
            AqiStatus::Fair => "#F1C21B",
            AqiStatus::Moderate => "#FF8C00",
            AqiStatus::Poor => "#DA1E28",
            AqiStatus::VeryPoor => "#8B00FF",
        }
    }

    /// Recommended action for the public
    pub fn advice(self) -> &'static str {
        match self {
            AqiStatus::Good => "Enjoy outdoor activities freely.",
            AqiStatus::Fair => "Sensitive groups should limit prolonged outdoor exertion.",
            AqiStatus::Moderate => "Reduce prolonged outdoor activities if you feel symptoms.",
            AqiStatus::Poor => "Avoid outdoor exercise. Keep windows closed.",
            AqiStatus::VeryPoor => {
                "Stay indoors. Use air purifiers. Wear N95 masks if going outside."
            }
        }
    }
}

impl fmt::Display for AqiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
