//! Integer m/z arithmetic.
//!
//! All m/z handling inside the engine is done on integers
//! (`round(mz * multiplication_factor)`), so that a fixed integer step tiles the
//! axis without gaps or overlaps across shards.

use super::error::CodecError;

/// Absorbs representation error of values such as `0.29 * 1000`.
const ROUNDING_SLACK: f64 = 1e-6;

/// Conversion between floating m/z and the integer bin grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MzScale {
    factor: i32,
    step: i64,
}

impl MzScale {
    /// Build a scale from the multiplication factor and the m/z resolution step.
    pub fn new(multiplication_factor: i32, lowest_resolution: f32) -> Result<Self, CodecError> {
        if multiplication_factor <= 0 {
            return Err(CodecError::InvalidScale(format!(
                "multiplication factor must be positive, got {multiplication_factor}"
            )));
        }
        if !(lowest_resolution > 0.0) {
            return Err(CodecError::InvalidScale(format!(
                "resolution must be positive, got {lowest_resolution}"
            )));
        }
        let step = (lowest_resolution as f64 * multiplication_factor as f64).round() as i64;
        if step < 1 {
            return Err(CodecError::InvalidScale(format!(
                "resolution {lowest_resolution} is finer than 1/{multiplication_factor}"
            )));
        }
        Ok(Self {
            factor: multiplication_factor,
            step,
        })
    }

    /// The multiplication factor.
    pub fn factor(&self) -> i32 {
        self.factor
    }

    /// Integer width of one bin.
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Resolution step in m/z units.
    pub fn resolution(&self) -> f64 {
        self.step as f64 / self.factor as f64
    }

    /// Nearest integer value of an m/z (used for peaks).
    #[inline]
    pub fn to_int(&self, mz: f64) -> i64 {
        (mz * self.factor as f64).round() as i64
    }

    /// Integer value rounded down, snapped down to a multiple of the step (lower bounds).
    pub fn lower_bound(&self, mz: f64) -> i64 {
        let raw = (mz * self.factor as f64 + ROUNDING_SLACK).floor() as i64;
        raw.div_euclid(self.step) * self.step
    }

    /// Integer value rounded up, snapped up to a multiple of the step (upper bounds).
    pub fn upper_bound(&self, mz: f64) -> i64 {
        let raw = (mz * self.factor as f64 - ROUNDING_SLACK).ceil() as i64;
        let snapped = raw.div_euclid(self.step) * self.step;
        if snapped < raw {
            snapped + self.step
        } else {
            snapped
        }
    }

    /// m/z value of an integer grid position.
    pub fn to_mz(&self, value: i64) -> f64 {
        value as f64 / self.factor as f64
    }

    /// Number of lines covering `[lower, upper)`.
    pub fn line_count(&self, lower: i64, upper: i64) -> u64 {
        if upper <= lower {
            0
        } else {
            ((upper - lower) / self.step) as u64
        }
    }
}
