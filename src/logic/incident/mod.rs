//! Incident Module
//!
//! Output records of the rule-based detectors (sequence matcher, profile
//! tracker). Signature matches produce `Detection`s instead, see `signatures`.

pub mod types;

pub use types::{Incident, IncidentEvidence, IncidentSeverity, ResponseAction, SpikeDetail, ThreatType};
