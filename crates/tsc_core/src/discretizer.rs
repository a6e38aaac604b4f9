//! Log-Linear Discretizer
//!
//! Compresses an unbounded, non-negative lane metric into one of `I` integer bins.
//!
//! ```text
//! L   = (I - 1) / M
//! F   = (1 - L) * (I - 1) / log2(1/L + 1)
//! bin = ceil(F * log2(x / (M*L) + 1) + L² * x)      for 0 <= x <= M
//! bin = I - 1                                        for x > M
//! ```
//!
//! The logarithmic term gives fine resolution near zero, where heavy-tailed
//! metrics such as waiting time spend most of their mass. The small linear
//! term keeps the mapping strictly increasing near the saturation point.
//! With this `F` both terms meet exactly at `x = M`, giving `I - 1`.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::config::{ConfigError, ConfigWarning};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscretizeError {
    #[error("Invalid input {value}: metric values must be non-negative")]
    InvalidInput { value: f64 },
}

/// Immutable `(I, M)` encoder with its derived constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discretizer {
    /// Effective interval count `I` (after clamping)
    intervals: u32,
    /// Interval count as configured
    requested_intervals: u32,
    /// Saturation value `M`
    max_value: f64,
    /// `L = (I - 1) / M`
    linear_fraction: f64,
    /// `F`
    scale: f64,
}

impl Discretizer {
    /// Build an encoder.
    ///
    /// `intervals > max_value` is clamped to `floor(max_value)`; the clamp is
    /// logged and reported by [`Discretizer::clamp_warning`].
    pub fn new(intervals: u32, max_value: f64) -> Result<Self, ConfigError> {
        if !max_value.is_finite() || max_value <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "max_lane_value must be a positive finite number, got {}",
                max_value
            )));
        }

        let mut effective = intervals;
        if intervals as f64 > max_value {
            effective = max_value.floor() as u32;
            warn!(
                requested = intervals,
                clamped = effective,
                max_value,
                "interval count exceeds max value, clamping"
            );
        }

        if effective < 2 {
            return Err(ConfigError::Validation(format!(
                "discretizer needs at least 2 intervals, got {} (max_lane_value {})",
                effective, max_value
            )));
        }

        let top = (effective - 1) as f64;
        let linear_fraction = top / max_value;
        let scale = (1.0 - linear_fraction) * top / (1.0 / linear_fraction + 1.0).log2();

        Ok(Self {
            intervals: effective,
            requested_intervals: intervals,
            max_value,
            linear_fraction,
            scale,
        })
    }

    /// Encode `x` into `[0, I-1]`.
    pub fn encode(&self, x: f64) -> Result<u32, DiscretizeError> {
        if x.is_nan() || x < 0.0 {
            return Err(DiscretizeError::InvalidInput { value: x });
        }
        let top = self.top_bin();
        if x > self.max_value {
            return Ok(top);
        }

        let l = self.linear_fraction;
        let log_term = self.scale * (x / (self.max_value * l) + 1.0).log2();
        let raw = (log_term + l * l * x).ceil();

        // ceil() can overshoot by one ulp at x == M
        Ok((raw.max(0.0) as u32).min(top))
    }

    pub fn intervals(&self) -> u32 {
        self.intervals
    }

    pub fn requested_intervals(&self) -> u32 {
        self.requested_intervals
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn linear_fraction(&self) -> f64 {
        self.linear_fraction
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Highest bin, `I - 1`.
    pub fn top_bin(&self) -> u32 {
        self.intervals - 1
    }

    pub fn clamp_warning(&self) -> Option<ConfigWarning> {
        (self.requested_intervals != self.intervals).then(|| ConfigWarning::IntervalsClamped {
            requested: self.requested_intervals,
            clamped: self.intervals,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
