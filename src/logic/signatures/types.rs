//! Signature Types
//!
//! Data structures only. Matching logic lives in `matcher`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectError, DetectResult};
use crate::logic::event::Event;

// ============================================================================
// SIGNATURE
// ============================================================================

/// One weighted behavioral indicator of a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub name: String,
    /// Relative weight, > 0. Normalized at match time.
    pub weight: f64,
    /// Case-insensitive substrings; any one of them matching an event is enough
    #[serde(alias = "iocs")]
    pub indicator_keywords: Vec<String>,
}

/// A named, weighted set of behavioral indicators defining a known threat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub category: String,
    /// 1-10
    pub severity: u8,
    pub behaviors: Vec<Behavior>,
}

impl Signature {
    pub fn new(name: &str, category: &str, severity: u8) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            severity,
            behaviors: Vec::new(),
        }
    }

    /// Append a behavior (builder style)
    pub fn behavior(mut self, name: &str, weight: f64, keywords: &[&str]) -> Self {
        self.behaviors.push(Behavior {
            name: name.to_string(),
            weight,
            indicator_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        });
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.behaviors.iter().map(|b| b.weight).sum()
    }

    /// Structural checks run once at store construction.
    /// A signature without behaviors is allowed: it simply never matches.
    pub fn validate(&self) -> DetectResult<()> {
        if self.name.trim().is_empty() {
            return Err(DetectError::invalid_signature(&self.name, "name is empty"));
        }
        if !(1..=10).contains(&self.severity) {
            return Err(DetectError::invalid_signature(
                &self.name,
                format!("severity {} outside 1-10", self.severity),
            ));
        }
        for behavior in &self.behaviors {
            if !behavior.weight.is_finite() || behavior.weight <= 0.0 {
                return Err(DetectError::invalid_signature(
                    &self.name,
                    format!("behavior '{}' weight must be > 0", behavior.name),
                ));
            }
            if behavior.indicator_keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(DetectError::invalid_signature(
                    &self.name,
                    format!("behavior '{}' has an empty keyword", behavior.name),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// KILL CHAIN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KillChainStage {
    Execution,
    Persistence,
    DefenseEvasion,
    CredentialAccess,
    LateralMovement,
    Exfiltration,
    Impact,
    /// Fixed stage of every elevated (AI-pattern) detection
    AiAutonomousExecution,
}

impl KillChainStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            KillChainStage::Execution => "Execution",
            KillChainStage::Persistence => "Persistence",
            KillChainStage::DefenseEvasion => "Defense Evasion",
            KillChainStage::CredentialAccess => "Credential Access",
            KillChainStage::LateralMovement => "Lateral Movement",
            KillChainStage::Exfiltration => "Exfiltration",
            KillChainStage::Impact => "Impact",
            KillChainStage::AiAutonomousExecution => "Execution (AI-Autonomous)",
        }
    }
}

impl fmt::Display for KillChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECOMMENDED ACTION
// ============================================================================

/// Recommendation only. The engine never executes remediation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendedAction {
    /// severity >= 9 and confidence >= 0.8
    ImmediateIsolation,
    /// severity >= 8 and confidence >= 0.7
    IsolateAndInvestigate,
    /// severity >= 6 and confidence >= 0.6
    MonitorClosely,
    ManualReview,
    /// Every elevated detection
    AiImmediateIsolation,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::ImmediateIsolation => {
                "IMMEDIATE ISOLATION + TERMINATE PROCESS + ALERT SOC"
            }
            RecommendedAction::IsolateAndInvestigate => "ISOLATE HOST + INVESTIGATE + ALERT",
            RecommendedAction::MonitorClosely => "MONITOR CLOSELY + LOG ALL ACTIVITY",
            RecommendedAction::ManualReview => "FLAG FOR MANUAL REVIEW",
            RecommendedAction::AiImmediateIsolation => "IMMEDIATE ISOLATION - AI-Powered Threat",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DETECTION
// ============================================================================

/// Result of a successful signature match. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub threat_name: String,
    pub category: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// 1-10
    pub severity: u8,
    pub matched_behavior_names: Vec<String>,
    /// matched weight / total weight
    pub raw_behavioral_score: f64,
    /// Matched against the elevated (AI-pattern) set
    pub is_elevated: bool,
    pub kill_chain_stage: KillChainStage,
    pub recommended_action: RecommendedAction,
    /// Subsequence of the input batch, one event per matched behavior
    pub evidence_events: Vec<Event>,
    pub detection_time: DateTime<Utc>,
}
