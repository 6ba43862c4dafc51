use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::event::EventType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "low",
            IncidentSeverity::Medium => "medium",
            IncidentSeverity::High => "high",
            IncidentSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response the engine recommends. Execution is left to the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResponseAction {
    Monitor,
    Quarantine,
    Kill,
}

impl ResponseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseAction::Monitor => "monitor",
            ResponseAction::Quarantine => "quarantine",
            ResponseAction::Kill => "kill",
        }
    }
}

impl fmt::Display for ResponseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    // Rate thresholds
    DataExfiltration,
    ActiveExploitation,
    CredentialAttack,
    PortScanning,
    Reconnaissance,

    // Ordered sequences
    KillChainAttack,
    PostExploitExfil,

    // Behavioral profiles
    RapidEscalation,
    SuspiciousBehavior,
    RepeatedFailures,
    LateralMovement,
    PrivilegeEscalation,

    // Statistical
    StatisticalAnomaly,
    TimeAnomaly,
    DistributedAttack,
}

impl ThreatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::DataExfiltration => "data_exfiltration",
            ThreatType::ActiveExploitation => "active_exploitation",
            ThreatType::CredentialAttack => "credential_attack",
            ThreatType::PortScanning => "port_scanning",
            ThreatType::Reconnaissance => "reconnaissance",
            ThreatType::KillChainAttack => "kill_chain_attack",
            ThreatType::PostExploitExfil => "post_exploit_exfil",
            ThreatType::RapidEscalation => "rapid_escalation",
            ThreatType::SuspiciousBehavior => "suspicious_behavior",
            ThreatType::RepeatedFailures => "repeated_failures",
            ThreatType::LateralMovement => "lateral_movement",
            ThreatType::PrivilegeEscalation => "privilege_escalation",
            ThreatType::StatisticalAnomaly => "statistical_anomaly",
            ThreatType::TimeAnomaly => "time_anomaly",
            ThreatType::DistributedAttack => "distributed_attack",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event type spiking above its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeDetail {
    pub event_type: EventType,
    pub current: usize,
    pub baseline_mean: f64,
    pub z_score: f64,
}

/// Supporting data attached to an incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncidentEvidence {
    None,
    EventCounts { counts: BTreeMap<EventType, usize> },
    EventSequence { sequence: Vec<EventType> },
    Profile { event_count: u64, suspicion_score: u64, failed_attempts: u64 },
    TargetCount { targets: usize },
    SourceCount { sources: usize },
    Spikes { spikes: Vec<SpikeDetail> },
    OffHours { hour: u32, recent_events: usize },
}

/// A rule-based threat determination. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: Uuid,
    pub threat_type: ThreatType,
    pub severity: IncidentSeverity,
    pub action: ResponseAction,
    pub reason: String,
    pub source_ip: Option<String>,
    pub evidence: IncidentEvidence,
    pub detected_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(
        threat_type: ThreatType,
        severity: IncidentSeverity,
        action: ResponseAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            incident_id: Uuid::new_v4(),
            threat_type,
            severity,
            action,
            reason: reason.into(),
            source_ip: None,
            evidence: IncidentEvidence::None,
            detected_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source_ip: Option<&str>) -> Self {
        self.source_ip = source_ip.map(|s| s.to_string());
        self
    }

    pub fn with_evidence(mut self, evidence: IncidentEvidence) -> Self {
        self.evidence = evidence;
        self
    }
}
