//! Rounding and clamping helpers

use num_traits::Float;

/// Round a value to the given number of decimal places
pub fn round_to<T: Float>(value: T, decimals: i32) -> T {
    let scale = T::from(10.0_f64.powi(decimals)).unwrap_or_else(T::one);
    (value * scale).round() / scale
}

/// Clamp a value so it is never negative. NaN is mapped to zero.
pub fn clamp_non_negative<T: Float>(value: T) -> T {
    if value.is_nan() || value < T::zero() {
        T::zero()
    } else {
        value
    }
}
