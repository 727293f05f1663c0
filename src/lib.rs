//! Synheart Window Stats - event-time window statistics for sensor readings.
//!
//! This library groups sensor readings into fixed event-time windows per
//! sensor and reports count, mean, variance and standard deviation for each
//! window once event time shows the window is complete.
//!
//! # Guarantees
//!
//! - **Event time only**: windows close when the watermark passes them, never on a wall-clock timer
//! - **Once per window**: each (sensor, window) is emitted at most once; late readings never reopen it
//! - **No raw storage**: only count, sum and sum of squares are kept per open window
//! - **Bad records are isolated**: invalid readings are counted and skipped, the stream continues
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 WindowedAggregationEngine                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│  Assigner   │──▶│ Accumulator │       │
//! │  │ (csv/jsonl) │   │ (60s bins)  │   │ (per key)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │  Watermark  │────── closes ──────▶│  Emitters   │       │
//! │  │  Tracker    │                     │ (sinks)     │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use synheart_window_stats::{EngineConfig, Event, Stats, Window, WindowedAggregationEngine};
//!
//! let mut engine = WindowedAggregationEngine::new(EngineConfig::default()).unwrap();
//! engine.subscribe(|key: &str, window: &Window, stats: &Stats| {
//!     println!("{key} {window}: mean={:.2}", stats.mean);
//! });
//!
//! engine.process(Event::new("sensor_A", 20.0, 0.0)).unwrap();
//! engine.process(Event::new("sensor_A", 20.5, 5.0)).unwrap();
//! engine.flush();
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod metrics;
pub mod source;

// Re-export key types at crate root for convenience
pub use config::{Config, EngineConfig, LateDataPolicy, OutputFormat};
pub use crate::core::{
    Accumulator, Disposition, Event, Stats, WatermarkTracker, Window, WindowAssigner, WindowKey,
    WindowedAggregationEngine,
};
pub use dispatch::{EngineWorker, EventFeed};
pub use emitter::{
    ChannelEmitter, Emitter, JsonLinesEmitter, LateChannel, LateEmitter, LateRecord, TextEmitter,
    WindowResult,
};
pub use error::{ConfigError, DispatchError, EventError, SourceError};
pub use metrics::{EngineMetrics, MetricsSnapshot, SharedEngineMetrics};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
