//! Sequence Matcher
//!
//! Pure functions over a count map or an ordered type list. Holds only its
//! rule tables.

use std::collections::BTreeMap;

use super::rules::SequenceConfig;
use crate::logic::event::{Event, EventType};
use crate::logic::incident::{Incident, IncidentEvidence};

#[derive(Debug, Clone, Default)]
pub struct SequenceMatcher {
    config: SequenceConfig,
}

impl SequenceMatcher {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// First threshold rule that fires, in table order
    pub fn check_thresholds(&self, counts: &BTreeMap<EventType, usize>) -> Option<Incident> {
        for rule in &self.config.thresholds {
            let count = counts.get(&rule.event_type).copied().unwrap_or(0);
            if count == 0 || count < rule.min_count {
                continue;
            }
            if rule.requires_other_types && !counts.iter().any(|(t, c)| *t != rule.event_type && *c > 0) {
                continue;
            }

            return Some(
                Incident::new(rule.threat_type, rule.severity, rule.action, rule.reason(count))
                    .with_evidence(IncidentEvidence::EventCounts { counts: counts.clone() }),
            );
        }
        None
    }

    /// First sequence rule whose pattern appears contiguously in `types`
    pub fn check_sequence(&self, types: &[EventType]) -> Option<Incident> {
        if types.len() < 2 {
            return None;
        }

        self.config
            .sequences
            .iter()
            .find(|rule| contains_sequence(types, &rule.pattern))
            .map(|rule| {
                Incident::new(rule.threat_type, rule.severity, rule.action, rule.reason.as_str())
                    .with_evidence(IncidentEvidence::EventSequence { sequence: types.to_vec() })
            })
    }

    /// `check_sequence` over one source's events, in the given order
    pub fn check_events(&self, events: &[Event]) -> Option<Incident> {
        let types: Vec<EventType> = events.iter().map(|e| e.event_type.clone()).collect();
        self.check_sequence(&types)
            .map(|incident| incident.with_source(events.first().and_then(|e| e.source_ip.as_deref())))
    }
}

/// Exact contiguous match at any starting offset
pub fn contains_sequence(types: &[EventType], pattern: &[EventType]) -> bool {
    if pattern.is_empty() || pattern.len() > types.len() {
        return false;
    }
    types.windows(pattern.len()).any(|w| w == pattern)
}

// ============================================================================
// TESTS
// ============================================================================
