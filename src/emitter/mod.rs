//! Sinks for finalized windows and late events.
//!
//! The engine only knows the [`Emitter`] and [`LateEmitter`] traits; the
//! writers and channel adapters here are the concrete sinks used by the CLI
//! and by embedding applications.

pub mod channel;
pub mod console;
pub mod types;

// Re-export commonly used types
pub use channel::{ChannelEmitter, LateChannel};
pub use console::{format_result, JsonLinesEmitter, TextEmitter};
pub use types::{Emitter, LateEmitter, LateRecord, WindowResult, MEAN_CONFIDENCE};
