//! Event Processor Module
//!
//! Streaming pipeline: events in, incidents out. The processor task is the
//! only owner of its rate window, sequence matcher and profile tracker; other
//! tasks talk to it through a `ProcessorHandle`.
//!
//! ## Structure
//! - `types.rs` - `ProcessorState`, `ProcessorConfig`, `ProcessorSnapshot`
//! - `pipeline.rs` - `EventProcessor` actor and `ProcessorHandle`
//!
//! ## Usage
//! ```ignore
//! let (event_tx, event_rx) = mpsc::channel(1024);
//! let (incident_tx, mut incident_rx) = mpsc::channel(256);
//! let mut processor = EventProcessor::new(event_rx, incident_tx, RateTracker::default(), SequenceMatcher::default());
//! let handle = processor.handle();
//! tokio::spawn(async move { processor.start().await });
//! // ...
//! handle.stop();
//! ```

pub mod types;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use types::{ProcessorConfig, ProcessorSnapshot, ProcessorState};
pub use pipeline::{wall_clock, EventProcessor, ProcessorHandle};
