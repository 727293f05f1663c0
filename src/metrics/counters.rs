//! Engine counters.
//!
//! Every event the engine sees ends up in exactly one of the outcome
//! counters (accepted, rejected, late), which makes the stream auditable
//! without retaining any readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live counters for one engine instance.
#[derive(Debug)]
pub struct EngineMetrics {
    /// Events handed to `process`
    events_received: AtomicU64,
    /// Events merged into an open window
    events_accepted: AtomicU64,
    /// Events rejected for a bad event time
    invalid_timestamps: AtomicU64,
    /// Events rejected for a non-finite value
    invalid_measurements: AtomicU64,
    /// Late events discarded
    late_dropped: AtomicU64,
    /// Late events routed to the side output
    late_side_output: AtomicU64,
    /// Windows finalized and emitted (any trigger)
    windows_emitted: AtomicU64,
    /// Windows finalized early because the open-window bound was hit
    windows_evicted: AtomicU64,
    /// Windows finalized by an explicit flush
    windows_flushed: AtomicU64,
    /// Engine start time
    session_start: DateTime<Utc>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_accepted: AtomicU64::new(0),
            invalid_timestamps: AtomicU64::new(0),
            invalid_measurements: AtomicU64::new(0),
            late_dropped: AtomicU64::new(0),
            late_side_output: AtomicU64::new(0),
            windows_emitted: AtomicU64::new(0),
            windows_evicted: AtomicU64::new(0),
            windows_flushed: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_timestamp(&self) {
        self.invalid_timestamps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_measurement(&self) {
        self.invalid_measurements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late_dropped(&self) {
        self.late_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late_side_output(&self) {
        self.late_side_output.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_emitted(&self) {
        self.windows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_evicted(&self) {
        self.windows_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_flushed(&self) {
        self.windows_flushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counters.
    pub fn stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            invalid_timestamps: self.invalid_timestamps.load(Ordering::Relaxed),
            invalid_measurements: self.invalid_measurements.load(Ordering::Relaxed),
            late_dropped: self.late_dropped.load(Ordering::Relaxed),
            late_side_output: self.late_side_output.load(Ordering::Relaxed),
            windows_emitted: self.windows_emitted.load(Ordering::Relaxed),
            windows_evicted: self.windows_evicted.load(Ordering::Relaxed),
            windows_flushed: self.windows_flushed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Events received: {}\n\
             - Events aggregated: {}\n\
             - Rejected (bad timestamp): {}\n\
             - Rejected (bad value): {}\n\
             - Late events dropped: {}\n\
             - Late events side-output: {}\n\
             - Windows emitted: {} ({} flushed, {} evicted at capacity)\n\
             - Session duration: {} seconds",
            stats.events_received,
            stats.events_accepted,
            stats.invalid_timestamps,
            stats.invalid_measurements,
            stats.late_dropped,
            stats.late_side_output,
            stats.windows_emitted,
            stats.windows_flushed,
            stats.windows_evicted,
            stats.session_duration_secs
        )
    }

    /// Write the current counters to disk as JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.stats()).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_accepted: u64,
    pub invalid_timestamps: u64,
    pub invalid_measurements: u64,
    pub late_dropped: u64,
    pub late_side_output: u64,
    pub windows_emitted: u64,
    pub windows_evicted: u64,
    pub windows_flushed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl MetricsSnapshot {
    /// Events rejected by validation.
    pub fn rejected(&self) -> u64 {
        self.invalid_timestamps + self.invalid_measurements
    }

    /// Events that arrived after their window was finalized.
    pub fn late(&self) -> u64 {
        self.late_dropped + self.late_side_output
    }
}

/// Thread-safe shared metrics.
pub type SharedEngineMetrics = Arc<EngineMetrics>;
