//! Decoding of input records into events.
//!
//! Two line formats are understood:
//!
//! - CSV: `key,value,time` where `time` is epoch seconds or RFC 3339
//! - JSON Lines: `{"key": "...", "value": 1.0, "event_time": 1678886400}`
//!
//! Blank lines and lines starting with `#` are ignored in both formats.

use crate::core::event::Event;
use crate::error::SourceError;
use chrono::DateTime;

/// Input record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Csv,
    Jsonl,
}

/// Decode one line. Returns `Ok(None)` for blank and comment lines.
///
/// `line_no` is only used for error messages.
pub fn parse_line(
    format: InputFormat,
    line: &str,
    line_no: usize,
) -> Result<Option<Event>, SourceError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    match format {
        InputFormat::Csv => parse_csv(trimmed, line_no).map(Some),
        InputFormat::Jsonl => serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|source| SourceError::Json {
                line: line_no,
                source,
            }),
    }
}

fn parse_csv(line: &str, line_no: usize) -> Result<Event, SourceError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(SourceError::FieldCount {
            line: line_no,
            fields: fields.len(),
        });
    }

    let value = fields[1].parse::<f64>().map_err(|_| SourceError::BadValue {
        line: line_no,
        raw: fields[1].to_string(),
    })?;
    let event_time = parse_time(fields[2]).ok_or_else(|| SourceError::BadTime {
        line: line_no,
        raw: fields[2].to_string(),
    })?;

    Ok(Event::new(fields[0], value, event_time))
}

/// Epoch seconds, or an RFC 3339 timestamp converted to epoch seconds.
fn parse_time(raw: &str) -> Option<f64> {
    if let Ok(secs) = raw.parse::<f64>() {
        return Some(secs);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.timestamp_millis() as f64 / 1000.0)
}

/// The twelve temperature readings of the original batch demo.
///
/// Times start at 2023-03-15 13:20:00 UTC.
pub fn demo_batch() -> Vec<Event> {
    [
        ("sensor_A", 20.0, 1_678_886_400),
        ("sensor_B", 25.0, 1_678_886_410),
        ("sensor_A", 20.5, 1_678_886_430),
        ("sensor_A", 21.0, 1_678_886_460),
        ("sensor_B", 24.5, 1_678_886_470),
        ("sensor_A", 20.3, 1_678_886_490),
        ("sensor_A", 22.0, 1_678_886_520),
        ("sensor_B", 26.0, 1_678_886_530),
        ("sensor_A", 23.0, 1_678_886_580),
        ("sensor_A", 20.0, 1_678_886_640),
        ("sensor_A", 21.0, 1_678_886_650),
        ("sensor_A", 22.0, 1_678_886_660),
    ]
    .into_iter()
    .map(|(key, value, secs)| Event::new(key, value, secs as f64))
    .collect()
}
