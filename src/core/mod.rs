//! Core functionality of the window statistics engine.
//!
//! This module contains:
//! - Events and their validation
//! - Fixed window assignment
//! - Incremental per-window statistics
//! - Watermark tracking
//! - The engine tying them together

pub mod accumulator;
pub mod engine;
pub mod event;
pub mod watermark;
pub mod windowing;

// Re-export commonly used types
pub use accumulator::{Accumulator, Stats};
pub use engine::{Disposition, WindowedAggregationEngine};
pub use event::Event;
pub use watermark::WatermarkTracker;
pub use windowing::{Window, WindowAssigner, WindowKey};
