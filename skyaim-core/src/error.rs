//! Error types for aim computation

use thiserror::Error;

/// Errors that can occur while computing a camera command.
///
/// Invalid operator or vehicle input never ends up here: it is normalized
/// (clamped or ignored) when it is published. These errors only describe
/// geometry that would produce non-finite results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AimError {
    /// Height used as a ratio denominator is zero, negative or not finite
    #[error("Invalid height: expected a positive finite value in meters, got {0}")]
    InvalidHeight(f64),

    /// A computed quantity came out as NaN or infinite
    #[error("Computed {quantity} is not finite")]
    NonFinite { quantity: &'static str },
}

impl AimError {
    /// Return `Ok(value)` when `value` is finite, otherwise a [`AimError::NonFinite`].
    pub(crate) fn check_finite(value: f64, quantity: &'static str) -> Result<f64, AimError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AimError::NonFinite { quantity })
        }
    }
}
