//! Counters describing what the engine did with its input.

pub mod counters;

// Re-export commonly used types
pub use counters::{EngineMetrics, MetricsSnapshot, SharedEngineMetrics};
