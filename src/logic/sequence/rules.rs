//! Sequence Rules - threshold and kill-chain tables
//!
//! Evaluation order is table order. The first threshold hit wins.

use serde::{Deserialize, Serialize};

use crate::logic::event::EventType;
use crate::logic::incident::{IncidentSeverity, ResponseAction, ThreatType};

// ============================================================================
// THRESHOLDS
// ============================================================================

pub const EXFIL_THRESHOLD: usize = 1;
pub const EXPLOIT_THRESHOLD: usize = 2;
pub const CRED_GUESS_THRESHOLD: usize = 3;
pub const SCAN_THRESHOLD: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub event_type: EventType,
    pub min_count: usize,
    /// Also require at least one other event type in the window
    #[serde(default)]
    pub requires_other_types: bool,
    pub threat_type: ThreatType,
    pub severity: IncidentSeverity,
    pub action: ResponseAction,
    /// Reason prefix, e.g. "Port scanning detected"
    pub label: String,
    /// Noun appended after the count; `None` omits the count
    #[serde(default)]
    pub unit: Option<String>,
}

impl ThresholdRule {
    fn new(
        event_type: EventType,
        min_count: usize,
        threat_type: ThreatType,
        severity: IncidentSeverity,
        action: ResponseAction,
        label: &str,
        unit: Option<&str>,
    ) -> Self {
        Self {
            event_type,
            min_count,
            requires_other_types: false,
            threat_type,
            severity,
            action,
            label: label.to_string(),
            unit: unit.map(|u| u.to_string()),
        }
    }

    pub fn reason(&self, count: usize) -> String {
        match &self.unit {
            Some(unit) => format!("{} ({} {})", self.label, count, unit),
            None => self.label.clone(),
        }
    }
}

pub fn default_threshold_rules() -> Vec<ThresholdRule> {
    use IncidentSeverity::*;
    use ResponseAction::*;

    let mut recon = ThresholdRule::new(
        EventType::RECON,
        1,
        ThreatType::Reconnaissance,
        Low,
        Monitor,
        "Reconnaissance activity with follow-up actions",
        None,
    );
    recon.requires_other_types = true;

    vec![
        ThresholdRule::new(
            EventType::EXFIL,
            EXFIL_THRESHOLD,
            ThreatType::DataExfiltration,
            Critical,
            Kill,
            "Data exfiltration detected",
            Some("events"),
        ),
        ThresholdRule::new(
            EventType::EXPLOIT,
            EXPLOIT_THRESHOLD,
            ThreatType::ActiveExploitation,
            High,
            Quarantine,
            "Multiple exploitation attempts",
            Some("events"),
        ),
        ThresholdRule::new(
            EventType::CRED_GUESS,
            CRED_GUESS_THRESHOLD,
            ThreatType::CredentialAttack,
            High,
            Quarantine,
            "Credential brute-force detected",
            Some("attempts"),
        ),
        ThresholdRule::new(
            EventType::SCAN,
            SCAN_THRESHOLD,
            ThreatType::PortScanning,
            Medium,
            Monitor,
            "Port scanning detected",
            Some("scans"),
        ),
        recon,
    ]
}

// ============================================================================
// SEQUENCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRule {
    /// Exact contiguous run of event types
    pub pattern: Vec<EventType>,
    pub threat_type: ThreatType,
    pub severity: IncidentSeverity,
    pub action: ResponseAction,
    pub reason: String,
}

pub fn default_sequence_rules() -> Vec<SequenceRule> {
    vec![
        SequenceRule {
            pattern: vec![EventType::RECON, EventType::SCAN, EventType::EXPLOIT],
            threat_type: ThreatType::KillChainAttack,
            severity: IncidentSeverity::Critical,
            action: ResponseAction::Kill,
            reason: "Complete attack kill-chain detected (recon -> scan -> exploit)".to_string(),
        },
        SequenceRule {
            pattern: vec![EventType::EXPLOIT, EventType::EXFIL],
            threat_type: ThreatType::PostExploitExfil,
            severity: IncidentSeverity::Critical,
            action: ResponseAction::Kill,
            reason: "Data exfiltration following exploitation".to_string(),
        },
    ]
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub thresholds: Vec<ThresholdRule>,
    pub sequences: Vec<SequenceRule>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            thresholds: default_threshold_rules(),
            sequences: default_sequence_rules(),
        }
    }
}

impl SequenceConfig {
    /// Stricter counts: flag scans and exploits earlier
    pub fn high_sensitivity() -> Self {
        let mut config = Self::default();
        for rule in &mut config.thresholds {
            if rule.event_type == EventType::SCAN {
                rule.min_count = 3;
            } else if rule.event_type == EventType::EXPLOIT || rule.event_type == EventType::CRED_GUESS {
                rule.min_count = rule.min_count.saturating_sub(1).max(1);
            }
        }
        config
    }

    /// Looser counts for noisy networks
    pub fn low_sensitivity() -> Self {
        let mut config = Self::default();
        for rule in &mut config.thresholds {
            if rule.event_type == EventType::SCAN {
                rule.min_count = 10;
            } else if rule.event_type == EventType::CRED_GUESS {
                rule.min_count = 5;
            }
        }
        config
    }
}
