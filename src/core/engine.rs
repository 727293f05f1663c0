//! Windowed aggregation engine.
//!
//! The engine owns the table of open windows and the watermark. Each
//! (key, window) pair moves through `absent -> open -> finalized`:
//!
//! - the first accepted reading for a pair opens it,
//! - the pair is finalized when the watermark reaches the window end, when
//!   the open-window bound forces it out, or on [`flush`],
//! - a finalized pair is never reopened; readings for it are late data.
//!
//! Forced finalization (flush or the open-window bound) closes a whole
//! window for every key at once and moves a closed-through floor up to its
//! end. Any window ending at or before the floor is treated as finalized,
//! so no per-key record of forced closures is kept.
//!
//! After every event the engine sweeps *all* open windows, not just the
//! event's own, so a sensor that goes quiet still gets its windows closed
//! as long as other sensors keep event time moving.
//!
//! [`flush`]: WindowedAggregationEngine::flush

use crate::config::{EngineConfig, LateDataPolicy};
use crate::core::accumulator::Accumulator;
use crate::core::event::Event;
use crate::core::watermark::WatermarkTracker;
use crate::core::windowing::{Window, WindowAssigner, WindowKey};
use crate::emitter::{Emitter, LateEmitter};
use crate::error::{ConfigError, EventError};
use crate::metrics::{EngineMetrics, MetricsSnapshot, SharedEngineMetrics};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What happened to an event that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Merged into an open window
    Accepted,
    /// Window already finalized; event discarded
    LateDropped,
    /// Window already finalized; event handed to the late-data subscribers
    LateSideOutput,
}

/// Why a window was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Watermark,
    Capacity,
    Flush,
}

/// Assigns readings to fixed windows per key and emits each window's
/// statistics once it is complete.
pub struct WindowedAggregationEngine {
    id: Uuid,
    config: EngineConfig,
    assigner: WindowAssigner,
    watermark: WatermarkTracker,
    /// Open windows, oldest window first
    open: BTreeMap<WindowKey, Accumulator>,
    /// End of the newest window finalized ahead of the watermark
    closed_through_ms: Option<i64>,
    emitters: Vec<Box<dyn Emitter>>,
    late_emitters: Vec<Box<dyn LateEmitter>>,
    metrics: SharedEngineMetrics,
}

impl WindowedAggregationEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let assigner = WindowAssigner::new(config.window_size)?;
        let lateness_ms = i64::try_from(config.allowed_lateness.as_millis())
            .map_err(|_| ConfigError::Invalid("allowed_lateness is too large".to_string()))?;

        let id = Uuid::new_v4();
        debug!(
            engine = %id,
            window_ms = assigner.size_millis(),
            lateness_ms,
            policy = ?config.late_data_policy,
            max_open_windows = ?config.max_open_windows,
            "engine created"
        );

        Ok(Self {
            id,
            config,
            assigner,
            watermark: WatermarkTracker::new(lateness_ms),
            open: BTreeMap::new(),
            closed_through_ms: None,
            emitters: Vec::new(),
            late_emitters: Vec::new(),
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    /// Register a sink for finalized windows.
    pub fn subscribe(&mut self, emitter: impl Emitter + 'static) {
        self.emitters.push(Box::new(emitter));
    }

    /// Register a sink for late events (used with [`LateDataPolicy::SideOutput`]).
    pub fn subscribe_late(&mut self, emitter: impl LateEmitter + 'static) {
        self.late_emitters.push(Box::new(emitter));
    }

    /// Process one event.
    ///
    /// Validation failures are counted and logged, leave the engine state
    /// untouched, and are returned so the caller may report them; the engine
    /// stays usable either way.
    pub fn process(&mut self, event: Event) -> Result<Disposition, EventError> {
        self.metrics.record_received();

        let (event_ms, window) = match self.validate(&event) {
            Ok(assigned) => assigned,
            Err(e) => {
                match e {
                    EventError::InvalidTimestamp(_) => self.metrics.record_invalid_timestamp(),
                    EventError::InvalidMeasurement(_) => self.metrics.record_invalid_measurement(),
                }
                warn!(engine = %self.id, key = event.key(), error = %e, "rejected event");
                return Err(e);
            }
        };

        let advanced = self.watermark.observe(event_ms);
        let window_key = WindowKey::new(event.key(), window);

        if self.is_finalized(&window_key) {
            return Ok(self.route_late(&event, &window));
        }

        match self.open.get_mut(&window_key) {
            Some(acc) => acc.merge_value(event.value())?,
            None => {
                let mut acc = Accumulator::new();
                acc.merge_value(event.value())?;
                debug!(engine = %self.id, key = event.key(), %window, "window opened");
                self.open.insert(window_key, acc);
            }
        }
        self.metrics.record_accepted();

        self.enforce_capacity();
        if advanced {
            self.sweep();
        }

        Ok(Disposition::Accepted)
    }

    /// Finalize every open window regardless of the watermark.
    ///
    /// Used at end of stream. Calling it again with nothing open is a no-op.
    /// Returns the number of windows emitted.
    pub fn flush(&mut self) -> usize {
        let open = std::mem::take(&mut self.open);
        let flushed = open.len();

        for (window_key, acc) in open {
            self.finalize(&window_key, &acc, Trigger::Flush);
            self.close_through(&window_key.window);
        }

        if flushed > 0 {
            debug!(engine = %self.id, flushed, "flushed open windows");
        }
        flushed
    }

    /// Flush and tear down the engine, returning its final counters.
    pub fn close(mut self) -> MetricsSnapshot {
        self.flush();
        self.metrics.stats()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current watermark in epoch milliseconds, `None` before the first event.
    pub fn watermark(&self) -> Option<i64> {
        self.watermark.watermark()
    }

    /// Number of windows currently open across all keys.
    pub fn open_windows(&self) -> usize {
        self.open.len()
    }

    /// The running aggregate of an open window, if any.
    pub fn open_accumulator(&self, key: &str, window: &Window) -> Option<&Accumulator> {
        self.open.get(&WindowKey::new(key, *window))
    }

    /// Shared handle to this engine's counters.
    pub fn metrics(&self) -> SharedEngineMetrics {
        Arc::clone(&self.metrics)
    }

    /// Window assignment used by this engine.
    pub fn assigner(&self) -> &WindowAssigner {
        &self.assigner
    }

    fn validate(&self, event: &Event) -> Result<(i64, Window), EventError> {
        let event_ms = event.event_time_millis()?;
        let window = self
            .assigner
            .assign_millis(event_ms)
            .ok_or(EventError::InvalidTimestamp(event.event_time()))?;
        event.validate_value()?;
        Ok((event_ms, window))
    }

    fn is_finalized(&self, window_key: &WindowKey) -> bool {
        let window = &window_key.window;
        self.watermark.is_closable(window)
            || self
                .closed_through_ms
                .is_some_and(|floor| window.end_millis() <= floor)
    }

    fn close_through(&mut self, window: &Window) {
        let end = window.end_millis();
        self.closed_through_ms = Some(self.closed_through_ms.map_or(end, |floor| floor.max(end)));
    }

    fn route_late(&mut self, event: &Event, window: &Window) -> Disposition {
        match self.config.late_data_policy {
            LateDataPolicy::Drop => {
                self.metrics.record_late_dropped();
                debug!(engine = %self.id, key = event.key(), %window, "dropped late event");
                Disposition::LateDropped
            }
            LateDataPolicy::SideOutput => {
                for emitter in self.late_emitters.iter_mut() {
                    emitter.emit_late(event, window);
                }
                self.metrics.record_late_side_output();
                debug!(engine = %self.id, key = event.key(), %window, "late event to side output");
                Disposition::LateSideOutput
            }
        }
    }

    /// Force out the oldest window, for every key, while above the
    /// open-window bound.
    fn enforce_capacity(&mut self) {
        let Some(max) = self.config.max_open_windows else {
            return;
        };

        while self.open.len() > max {
            let Some(oldest) = self.open.first_key_value().map(|(k, _)| k.window) else {
                break;
            };
            warn!(
                engine = %self.id,
                window = %oldest,
                open = self.open.len(),
                max_open_windows = max,
                "open window limit exceeded, finalizing window early"
            );
            while let Some(entry) = self.open.first_entry() {
                if entry.key().window != oldest {
                    break;
                }
                let (window_key, acc) = entry.remove_entry();
                self.finalize(&window_key, &acc, Trigger::Capacity);
            }
            self.close_through(&oldest);
        }
    }

    /// Finalize every open window the watermark has passed.
    fn sweep(&mut self) {
        while let Some(entry) = self.open.first_entry() {
            if !self.watermark.is_closable(&entry.key().window) {
                break;
            }
            let (window_key, acc) = entry.remove_entry();
            self.finalize(&window_key, &acc, Trigger::Watermark);
        }
    }

    fn finalize(&mut self, window_key: &WindowKey, acc: &Accumulator, trigger: Trigger) {
        let stats = acc.finalize();
        for emitter in self.emitters.iter_mut() {
            emitter.emit(&window_key.key, &window_key.window, &stats);
        }

        self.metrics.record_window_emitted();
        match trigger {
            Trigger::Watermark => {}
            Trigger::Capacity => self.metrics.record_window_evicted(),
            Trigger::Flush => self.metrics.record_window_flushed(),
        }
        debug!(
            engine = %self.id,
            key = %window_key.key,
            window = %window_key.window,
            count = stats.count,
            ?trigger,
            "window finalized"
        );
    }
}

impl Drop for WindowedAggregationEngine {
    fn drop(&mut self) {
        if !self.open.is_empty() {
            self.flush();
        }
    }
}
