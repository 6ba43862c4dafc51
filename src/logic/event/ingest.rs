//! Event Ingestion
//!
//! Decodes raw JSON into validated `Event`s. A malformed entry is skipped and
//! logged; it never invalidates the rest of the batch.

use std::io::BufRead;

use serde_json::Value;

use super::types::Event;
use crate::logic::error::{DetectError, DetectResult};

/// Result of decoding a batch of raw events
#[derive(Debug, Default)]
pub struct IngestBatch {
    pub events: Vec<Event>,
    pub skipped: usize,
}

/// Decode and validate one raw event
pub fn parse_event(value: Value) -> DetectResult<Event> {
    let event: Event =
        serde_json::from_value(value).map_err(|e| DetectError::MalformedEvent(e.to_string()))?;
    event.validate()?;
    Ok(event)
}

/// Decode a batch of raw events, dropping malformed ones.
/// Input order is preserved for the events that survive.
pub fn parse_events<I>(values: I) -> IngestBatch
where
    I: IntoIterator<Item = Value>,
{
    let mut batch = IngestBatch::default();
    for (index, value) in values.into_iter().enumerate() {
        match parse_event(value) {
            Ok(event) => batch.events.push(event),
            Err(e) => {
                log::warn!("[Ingest] Skipping event #{}: {}", index, e);
                batch.skipped += 1;
            }
        }
    }
    batch
}

/// Read newline-delimited JSON events. Blank lines are ignored; unreadable or
/// malformed lines are counted as skipped.
pub fn read_jsonl<R: BufRead>(reader: R) -> IngestBatch {
    let mut batch = IngestBatch::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("[Ingest] Unreadable line {}: {}", line_no + 1, e);
                batch.skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(&line)
            .map_err(DetectError::from)
            .and_then(parse_event);

        match parsed {
            Ok(event) => batch.events.push(event),
            Err(e) => {
                log::warn!("[Ingest] Skipping line {}: {}", line_no + 1, e);
                batch.skipped += 1;
            }
        }
    }
    batch
}
