//! Piecewise-linear comfort curve (predicted percentage dissatisfied vs.
//! indoor temperature).
//!
//! The dispatch model never evaluates the curve directly. It bounds the PPD
//! variable from below by the line through every consecutive breakpoint pair.
//! For a convex curve the maximum of those lines is the curve itself, and a
//! non-negative comfort price drives the PPD variable onto it.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One linear piece between two consecutive breakpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComfortSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl ComfortSegment {
    /// Slope in PPD per kelvin.
    pub fn slope(&self) -> f64 {
        (self.y1 - self.y0) / (self.x1 - self.x0)
    }

    /// Value of the segment's supporting line at `temperature`.
    ///
    /// The line is extended beyond `[x0, x1]`; that is what makes the
    /// maximum over all segments a lower envelope.
    pub fn line_at(&self, temperature: f64) -> f64 {
        self.y0 + (temperature - self.x0) * self.slope()
    }
}

/// Ordered `(temperature, ppd)` breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortBreakpoints {
    /// Indoor temperatures in °C, strictly increasing
    pub temperatures: Vec<f64>,
    /// PPD value at each temperature
    pub ppd: Vec<f64>,
}

impl ComfortBreakpoints {
    /// Build and validate a breakpoint set.
    pub fn new(temperatures: Vec<f64>, ppd: Vec<f64>) -> Result<Self, ValidationError> {
        let bp = Self { temperatures, ppd };
        bp.validate()?;
        Ok(bp)
    }

    /// Breakpoints measured for the reference dwelling (19..23 °C).
    pub fn reference() -> Self {
        Self {
            temperatures: vec![19.0, 20.0, 21.0, 22.0, 23.0],
            ppd: vec![12.3, 9.9, 8.2, 7.2, 6.6],
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ppd.len() != self.temperatures.len() {
            return Err(ValidationError::SeriesLength {
                name: "comfort.ppd".to_string(),
                expected: self.temperatures.len(),
                actual: self.ppd.len(),
            });
        }
        if self.temperatures.len() < 2 {
            return Err(ValidationError::TooFewBreakpoints(self.temperatures.len()));
        }
        for (index, pair) in self.temperatures.windows(2).enumerate() {
            if !(pair[1] > pair[0]) {
                return Err(ValidationError::BreakpointsNotIncreasing { index: index + 1 });
            }
        }
        if let Some(index) = self
            .temperatures
            .iter()
            .chain(self.ppd.iter())
            .position(|v| !v.is_finite())
        {
            return Err(ValidationError::InvalidRating {
                name: "comfort".to_string(),
                reason: format!("non-finite breakpoint value at position {index}"),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Consecutive breakpoint pairs.
    pub fn segments(&self) -> impl Iterator<Item = ComfortSegment> + '_ {
        self.temperatures
            .windows(2)
            .zip(self.ppd.windows(2))
            .map(|(x, y)| ComfortSegment {
                x0: x[0],
                y0: y[0],
                x1: x[1],
                y1: y[1],
            })
    }

    /// Maximum over all segment lines at `temperature`.
    pub fn envelope(&self, temperature: f64) -> f64 {
        self.segments()
            .map(|s| s.line_at(temperature))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Slopes are non-decreasing, i.e. the curve is convex.
    pub fn is_convex(&self) -> bool {
        let slopes: Vec<f64> = self.segments().map(|s| s.slope()).collect();
        slopes.windows(2).all(|w| w[1] >= w[0] - 1e-12)
    }
}

impl Default for ComfortBreakpoints {
    fn default() -> Self {
        Self::reference()
    }
}
