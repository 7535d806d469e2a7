//! # AQI Math
//!
//! Numeric building blocks shared by the AQI forecasting crates.
//! This crate provides rounding and clamping helpers, the pollutant decay
//! and peak-traffic curves used by the decay forecasting variant, and
//! small summary statistics.

use thiserror::Error;

pub mod decay;
pub mod rounding;
pub mod stats;

pub use decay::{PollutantDecay, TrafficProfile};
pub use rounding::{clamp_non_negative, round_to};

/// Errors that can occur in AQI math calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for AQI math operations
pub type Result<T> = std::result::Result<T, MathError>;
