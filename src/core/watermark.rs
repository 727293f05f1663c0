//! Event-time progress tracking.

use crate::core::windowing::Window;

/// Tracks the highest event time seen and derives the watermark from it.
///
/// The watermark trails the highest observed event time by the allowed
/// lateness and never moves backward.
#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    allowed_lateness_ms: i64,
    max_event_time_ms: Option<i64>,
}

impl WatermarkTracker {
    pub fn new(allowed_lateness_ms: i64) -> Self {
        Self {
            allowed_lateness_ms: allowed_lateness_ms.max(0),
            max_event_time_ms: None,
        }
    }

    /// Record an event time (epoch milliseconds).
    ///
    /// Returns `true` when the watermark advanced.
    pub fn observe(&mut self, event_time_ms: i64) -> bool {
        match self.max_event_time_ms {
            Some(current) if event_time_ms <= current => false,
            _ => {
                self.max_event_time_ms = Some(event_time_ms);
                true
            }
        }
    }

    /// Current watermark, or `None` before the first event.
    pub fn watermark(&self) -> Option<i64> {
        self.max_event_time_ms
            .map(|t| t.saturating_sub(self.allowed_lateness_ms))
    }

    /// A window can be finalized once the watermark reaches its end.
    pub fn is_closable(&self, window: &Window) -> bool {
        self.watermark()
            .is_some_and(|wm| wm >= window.end_millis())
    }
}
