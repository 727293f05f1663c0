//! Incremental per-window statistics.
//!
//! An [`Accumulator`] keeps the sufficient statistics of a sample (count,
//! sum, sum of squares) so that mean, variance and standard deviation can be
//! derived without retaining the raw readings.

use crate::error::EventError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Running sufficient statistics for one (key, window).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    count: u64,
    sum: f64,
    sum_of_squares: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a set of readings into a fresh accumulator.
    ///
    /// Non-finite readings are skipped.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut acc = Self::new();
        for value in values {
            let _ = acc.merge_value(value);
        }
        acc
    }

    /// Add one reading. Non-finite readings are rejected and leave the
    /// accumulator untouched.
    pub fn merge_value(&mut self, value: f64) -> Result<(), EventError> {
        if !value.is_finite() {
            return Err(EventError::InvalidMeasurement(value));
        }
        self.count += 1;
        self.sum += value;
        self.sum_of_squares += value * value;
        Ok(())
    }

    /// Combine two partial aggregates field by field.
    pub fn merge(&self, other: &Accumulator) -> Accumulator {
        Accumulator {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            sum_of_squares: self.sum_of_squares + other.sum_of_squares,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.sum_of_squares
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Derive the window statistics.
    ///
    /// Variance is the Bessel-corrected sample variance. A single reading has
    /// no defined spread, so variance and standard deviation are NaN.
    pub fn finalize(&self) -> Stats {
        let n = self.count as f64;
        let mean = self.sum / n;
        let variance = if self.count > 1 {
            // Rounding can push this a hair below zero for constant samples.
            ((self.sum_of_squares - self.sum * self.sum / n) / (n - 1.0)).max(0.0)
        } else {
            f64::NAN
        };

        Stats {
            count: self.count,
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }
}

/// Final statistics of a closed window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub count: u64,
    pub mean: f64,
    /// Sample variance; NaN when `count == 1`
    pub variance: f64,
    /// Sample standard deviation; NaN when `count == 1`
    pub std_dev: f64,
}

impl Stats {
    /// Standard error of the mean.
    pub fn std_error(&self) -> f64 {
        self.std_dev / (self.count as f64).sqrt()
    }

    /// Two-sided Student-t confidence interval for the window mean.
    ///
    /// Returns `None` for singleton windows or a confidence level outside
    /// `(0, 1)`.
    pub fn mean_confidence_interval(&self, confidence: f64) -> Option<(f64, f64)> {
        if self.count < 2 || !(confidence > 0.0 && confidence < 1.0) {
            return None;
        }
        let dist = StudentsT::new(0.0, 1.0, (self.count - 1) as f64).ok()?;
        let t = dist.inverse_cdf(0.5 + confidence / 2.0);
        let half_width = t * self.std_error();
        Some((self.mean - half_width, self.mean + half_width))
    }
}
