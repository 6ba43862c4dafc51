use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logic::event::EventType;

/// Running behavior summary for one source IP.
///
/// `first_seen` and `last_seen` are arrival times, not event timestamps,
/// so eviction and escalation windows share one clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub source_ip: String,
    pub first_seen: f64,
    pub last_seen: f64,
    pub event_count: u64,
    pub event_types: BTreeMap<EventType, u64>,
    pub failed_attempts: u64,
    pub suspicion_score: u64,
}

impl SourceProfile {
    pub fn new(source_ip: &str, now: f64) -> Self {
        Self {
            source_ip: source_ip.to_string(),
            first_seen: now,
            last_seen: now,
            event_count: 0,
            event_types: BTreeMap::new(),
            failed_attempts: 0,
            suspicion_score: 0,
        }
    }

    /// Seconds since first contact
    pub fn age(&self, now: f64) -> f64 {
        (now - self.first_seen).max(0.0)
    }

    pub fn idle(&self, now: f64) -> f64 {
        (now - self.last_seen).max(0.0)
    }
}
