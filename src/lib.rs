//! # AQI Forecast Workspace
//!
//! Facade over the workspace crates: [`aqi_math`] for the numeric helpers
//! and [`aqi_forecast`] for the store, registry, selection and forecasting.
//!
//! ## Example
//!
//! ```
//! use aqi_forecast_workspace::forecast::AqiStatus;
//! use aqi_forecast_workspace::math::round_to;
//!
//! let value = round_to(1.504_f64, 2);
//! assert_eq!(AqiStatus::from_value(value), AqiStatus::Good);
//! ```

pub use aqi_forecast as forecast;
pub use aqi_math as math;
