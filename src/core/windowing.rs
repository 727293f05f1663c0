//! Fixed event-time windows.
//!
//! Windows are half-open `[start, end)` intervals of a fixed duration,
//! aligned to the Unix epoch. They are plain values: two windows with the
//! same bounds are the same window.

use crate::core::event::to_millis;
use crate::error::{ConfigError, EventError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A fixed-size event-time window, bounds in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    start_ms: i64,
    end_ms: i64,
}

impl Window {
    pub(crate) fn from_millis(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Inclusive start in epoch milliseconds.
    pub fn start_millis(&self) -> i64 {
        self.start_ms
    }

    /// Exclusive end in epoch milliseconds.
    pub fn end_millis(&self) -> i64 {
        self.end_ms
    }

    pub fn start(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.start_ms).unwrap_or_default()
    }

    pub fn end(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.end_ms).unwrap_or_default()
    }

}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.end().format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}

/// The identity under which one aggregate is tracked.
///
/// Ordering is by window first, then by key, so iterating an ordered map of
/// keys walks windows oldest-first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey {
    pub window: Window,
    pub key: String,
}

impl WindowKey {
    pub fn new(key: impl Into<String>, window: Window) -> Self {
        Self {
            window,
            key: key.into(),
        }
    }
}

/// Maps event times onto epoch-aligned windows of one fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAssigner {
    size_ms: i64,
}

impl WindowAssigner {
    /// Create an assigner for windows of the given size.
    ///
    /// The size must be at least one millisecond.
    pub fn new(size: Duration) -> Result<Self, ConfigError> {
        let size_ms = i64::try_from(size.as_millis())
            .map_err(|_| ConfigError::Invalid(format!("window size {size:?} is too large")))?;
        if size_ms <= 0 {
            return Err(ConfigError::Invalid(
                "window size must be at least 1ms".to_string(),
            ));
        }
        Ok(Self { size_ms })
    }

    pub fn size_millis(&self) -> i64 {
        self.size_ms
    }

    /// Assign an event time (epoch seconds) to its window.
    pub fn assign(&self, event_time: f64) -> Result<Window, EventError> {
        self.assign_millis(to_millis(event_time)?)
            .ok_or(EventError::InvalidTimestamp(event_time))
    }

    /// Assign an already-validated epoch-millisecond timestamp.
    ///
    /// Returns `None` when the window end would overflow.
    pub fn assign_millis(&self, timestamp_ms: i64) -> Option<Window> {
        let start = timestamp_ms - timestamp_ms.rem_euclid(self.size_ms);
        let end = start.checked_add(self.size_ms)?;
        Some(Window::from_millis(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minute() -> WindowAssigner {
        WindowAssigner::new(Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_window_alignment() {
        let window = minute().assign(1_678_886_430.0).unwrap();
        assert_eq!(window.start_millis(), 1_678_886_400_000);
        assert_eq!(window.end_millis(), 1_678_886_460_000);
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let assigner = minute();
        let window = assigner.assign(30.0).unwrap();
        assert_eq!(assigner.assign(0.0).unwrap(), window);
        assert_eq!(assigner.assign(59.999).unwrap(), window);
        assert_ne!(assigner.assign(60.0).unwrap(), window);
    }

    #[test]
    fn test_millisecond_windows_hold_decimal_times() {
        let assigner = WindowAssigner::new(Duration::from_millis(1)).unwrap();
        for (t, start) in [(1.001, 1_001), (2.003, 2_003), (0.3, 300)] {
            let window = assigner.assign(t).unwrap();
            assert_eq!(window.start_millis(), start);
            assert_eq!(window.end_millis(), start + 1);
        }
    }

    #[test]
    fn test_boundary_belongs_to_next_window() {
        let assigner = minute();
        let first = assigner.assign(59.999).unwrap();
        let second = assigner.assign(60.0).unwrap();
        assert_eq!(first.end_millis(), second.start_millis());
        assert_ne!(first, second);
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let assigner = WindowAssigner::new(Duration::from_millis(1500)).unwrap();
        for t in [0.0, 0.001, 1.499, 1.5, 7.25, 1_678_886_489.75] {
            let a = assigner.assign(t).unwrap();
            let b = assigner.assign(t).unwrap();
            assert_eq!(a, b);
            let t_ms = to_millis(t).unwrap();
            assert!(a.start_millis() <= t_ms && t_ms < a.end_millis());
            assert_eq!(a.end_millis() - a.start_millis(), 1500);
        }
    }

    #[test]
    fn test_invalid_input() {
        let assigner = minute();
        assert!(assigner.assign(-0.5).is_err());
        assert!(assigner.assign(f64::NAN).is_err());
        assert!(WindowAssigner::new(Duration::ZERO).is_err());
        assert!(WindowAssigner::new(Duration::from_micros(500)).is_err());
    }

    #[test]
    fn test_window_key_orders_by_window_first() {
        let assigner = minute();
        let early = WindowKey::new("zeta", assigner.assign(10.0).unwrap());
        let late = WindowKey::new("alpha", assigner.assign(70.0).unwrap());
        assert!(early < late);
    }
}
