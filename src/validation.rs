/**
 * Input Validation Module
 *
 * Centralized validation for configuration values
 */
use thiserror::Error;

use crate::error::BiometricError;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl From<ValidationError> for BiometricError {
    fn from(err: ValidationError) -> Self {
        BiometricError::InvalidConfig(err.to_string())
    }
}

/// Validate face match tolerance (finite, >= 0)
pub fn validate_tolerance(tolerance: f64) -> Result<f64, ValidationError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ValidationError::InvalidRange(format!(
            "Face tolerance must be a finite value >= 0, got {}",
            tolerance
        )));
    }
    Ok(tolerance)
}

/// Validate voice decision threshold (finite, > 0)
pub fn validate_threshold(threshold: f64) -> Result<f64, ValidationError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ValidationError::InvalidRange(format!(
            "Voice threshold must be a finite value > 0, got {}",
            threshold
        )));
    }
    Ok(threshold)
}

/// Validate frame sampling interval (1 to 120 frames)
pub fn validate_sample_interval(interval: u32) -> Result<u32, ValidationError> {
    if !(1..=120).contains(&interval) {
        return Err(ValidationError::InvalidRange(format!(
            "Sample interval must be between 1 and 120 frames, got {}",
            interval
        )));
    }
    Ok(interval)
}
