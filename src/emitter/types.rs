//! Sink traits and the result record handed to them.

use crate::core::accumulator::Stats;
use crate::core::event::Event;
use crate::core::windowing::Window;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Receives every finalized window exactly once.
///
/// Implementations must return quickly; the engine calls them inline and
/// does not retry. Any closure `FnMut(&str, &Window, &Stats)` is an emitter.
pub trait Emitter: Send {
    fn emit(&mut self, key: &str, window: &Window, stats: &Stats);
}

impl<F> Emitter for F
where
    F: FnMut(&str, &Window, &Stats) + Send,
{
    fn emit(&mut self, key: &str, window: &Window, stats: &Stats) {
        self(key, window, stats)
    }
}

/// Receives late events when the engine runs with the side-output policy.
pub trait LateEmitter: Send {
    fn emit_late(&mut self, event: &Event, window: &Window);
}

impl<F> LateEmitter for F
where
    F: FnMut(&Event, &Window) + Send,
{
    fn emit_late(&mut self, event: &Event, window: &Window) {
        self(event, window)
    }
}

/// Confidence level of the interval reported with each window mean.
pub const MEAN_CONFIDENCE: f64 = 0.95;

/// An owned, serializable copy of one emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub key: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub stats: Stats,
    /// 95% Student-t interval for the mean; `None` for singleton windows
    pub mean_ci95: Option<(f64, f64)>,
}

impl WindowResult {
    pub fn new(key: &str, window: &Window, stats: &Stats) -> Self {
        Self {
            key: key.to_string(),
            window_start: window.start(),
            window_end: window.end(),
            stats: *stats,
            mean_ci95: stats.mean_confidence_interval(MEAN_CONFIDENCE),
        }
    }
}

/// An owned copy of one late event and the window it missed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateRecord {
    pub event: Event,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl LateRecord {
    pub fn new(event: &Event, window: &Window) -> Self {
        Self {
            event: event.clone(),
            window_start: window.start(),
            window_end: window.end(),
        }
    }
}
