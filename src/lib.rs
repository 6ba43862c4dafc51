//! AEGIS behavioral threat detection engine.
//!
//! Batch analysis goes through [`DetectionEngine`]; streaming analysis
//! through an [`EventProcessor`] fed over tokio channels.

pub mod constants;
pub mod logic;

pub use logic::ai_pattern::{AiPatternScore, AiPatternScorer};
pub use logic::config::EngineConfig;
pub use logic::engine::{DetectionEngine, DetectionSummary};
pub use logic::error::{DetectError, DetectResult};
pub use logic::event::{Event, EventType};
pub use logic::incident::{Incident, IncidentSeverity, ResponseAction, ThreatType};
pub use logic::processor::{EventProcessor, ProcessorHandle, ProcessorState};
pub use logic::rate::RateTracker;
pub use logic::sequence::SequenceMatcher;
pub use logic::signatures::{Detection, Signature, SignatureStore};
