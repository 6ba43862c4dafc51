//! Event Module
//!
//! The immutable unit of observation flowing through the engine.
//!
//! ## Structure
//! - `types`: `Event` and the validated `EventType` newtype
//! - `ingest`: raw JSON / JSONL decoding with skip-and-log semantics

pub mod types;
pub mod ingest;

pub use types::{Event, EventType, DEFAULT_EVENT_SEVERITY};
pub use ingest::{parse_event, parse_events, read_jsonl, IngestBatch};
