//! Sensor observations fed into the engine.

use crate::error::EventError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation: which sensor, what it read, and when.
///
/// Event time is expressed as epoch seconds. Construction never fails;
/// validation happens when the engine processes the event so that a bad
/// record can be counted instead of panicking at the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    key: String,
    value: f64,
    event_time: f64,
}

impl Event {
    pub fn new(key: impl Into<String>, value: f64, event_time: f64) -> Self {
        Self {
            key: key.into(),
            value,
            event_time,
        }
    }

    /// Create an event stamped with a calendar time.
    pub fn at(key: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        let secs = timestamp.timestamp_millis() as f64 / 1000.0;
        Self::new(key, value, secs)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Event time in epoch seconds.
    pub fn event_time(&self) -> f64 {
        self.event_time
    }

    /// Event time as whole epoch milliseconds.
    ///
    /// Fails for negative or non-finite times, and for times `chrono` cannot
    /// represent as a calendar date.
    pub fn event_time_millis(&self) -> Result<i64, EventError> {
        to_millis(self.event_time)
    }

    /// Check that the measurement can enter an aggregate.
    pub fn validate_value(&self) -> Result<(), EventError> {
        if self.value.is_finite() {
            Ok(())
        } else {
            Err(EventError::InvalidMeasurement(self.value))
        }
    }
}

/// Convert epoch seconds to epoch milliseconds, rejecting invalid input.
pub(crate) fn to_millis(secs: f64) -> Result<i64, EventError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(EventError::InvalidTimestamp(secs));
    }
    let scaled = secs * 1000.0;
    // Decimal times like 1.001 land a hair below the millisecond in binary.
    let nearest = scaled.round();
    let tolerance = (scaled * f64::EPSILON * 4.0).max(1e-6);
    let millis = if (scaled - nearest).abs() <= tolerance {
        nearest
    } else {
        scaled.floor()
    };
    if millis > i64::MAX as f64 {
        return Err(EventError::InvalidTimestamp(secs));
    }
    let millis = millis as i64;
    if DateTime::<Utc>::from_timestamp_millis(millis).is_none() {
        return Err(EventError::InvalidTimestamp(secs));
    }
    Ok(millis)
}
