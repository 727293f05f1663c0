//! Line-oriented writers for finalized windows.

use crate::core::accumulator::Stats;
use crate::core::windowing::Window;
use crate::emitter::types::{Emitter, WindowResult};
use chrono_tz::Tz;
use std::io::Write;

/// Render one window in the human-readable report format.
pub fn format_result(key: &str, window: &Window, stats: &Stats, tz: Option<Tz>) -> String {
    let start = match tz {
        Some(tz) => window
            .start()
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string(),
        None => window.start().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    format!(
        "Sensor: {key}, Window: {start}, Stats: Count={}, Mean={:.2}, StdDev={:.4}, Variance={:.4}",
        stats.count, stats.mean, stats.std_dev, stats.variance
    )
}

/// Writes one report line per window.
pub struct TextEmitter<W: Write + Send> {
    writer: W,
    tz: Option<Tz>,
}

impl<W: Write + Send> TextEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, tz: None }
    }

    /// Render window bounds in the given zone instead of UTC.
    pub fn with_timezone(mut self, tz: Option<Tz>) -> Self {
        self.tz = tz;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Emitter for TextEmitter<W> {
    fn emit(&mut self, key: &str, window: &Window, stats: &Stats) {
        let line = format_result(key, window, stats, self.tz);
        if let Err(e) = writeln!(self.writer, "{line}") {
            tracing::warn!(key, error = %e, "failed to write window result");
        }
    }
}

/// Writes one JSON object per window.
pub struct JsonLinesEmitter<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Emitter for JsonLinesEmitter<W> {
    fn emit(&mut self, key: &str, window: &Window, stats: &Stats) {
        let record = WindowResult::new(key, window, stats);
        let written = serde_json::to_writer(&mut self.writer, &record)
            .map_err(std::io::Error::other)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(key, error = %e, "failed to write window result");
        }
    }
}
