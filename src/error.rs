//! Error types shared across the engine, configuration and adapters.

use thiserror::Error;

/// Per-event validation failures.
///
/// These are never fatal: the engine counts and logs them, leaves its state
/// untouched and keeps processing the stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    /// Event time is negative, non-finite or outside the representable range.
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(f64),
    /// Measurement value is NaN or infinite.
    #[error("invalid measurement {0}")]
    InvalidMeasurement(f64),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while decoding input records into events.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("line {line}: expected `key,value,time`, got {fields} field(s)")]
    FieldCount { line: usize, fields: usize },
    #[error("line {line}: bad value `{raw}`")]
    BadValue { line: usize, raw: String },
    #[error("line {line}: bad timestamp `{raw}`")]
    BadTime { line: usize, raw: String },
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the threaded engine dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to start engine worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine worker is no longer accepting events")]
    Closed,
    #[error("engine worker thread panicked")]
    WorkerPanicked,
}
