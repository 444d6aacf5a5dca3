use thiserror::Error;

use crate::canvas::CanvasId;

/// Errors raised by drawing calls. A call that returns one of these has not
/// touched its cursor or canvas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawError {
    #[error("invalid {name}: expected {expected}, got {value}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("invalid segment count: expected at least 1, got {0}")]
    InvalidSegmentCount(usize),

    #[error("empty cross-section: pinw and gapw are both zero")]
    EmptyCrossSection,

    #[error("canvas {0} does not exist in this library")]
    UnknownCanvas(CanvasId),
}

pub(crate) fn finite(name: &'static str, value: f64) -> Result<f64, DrawError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DrawError::InvalidParameter {
            name,
            expected: "a finite number",
            value,
        })
    }
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<f64, DrawError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DrawError::InvalidParameter {
            name,
            expected: "a finite value >= 0",
            value,
        })
    }
}

/// `value` if it is finite and strictly positive, otherwise an
/// [`DrawError::InvalidParameter`] naming `name`.
pub fn positive(name: &'static str, value: f64) -> Result<f64, DrawError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DrawError::InvalidParameter {
            name,
            expected: "a finite value > 0",
            value,
        })
    }
}
