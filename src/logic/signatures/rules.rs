//! Signature Matching Rules & Thresholds
//!
//! Constants and config only. No matching logic here.

use serde::{Deserialize, Serialize};

use super::types::KillChainStage;

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Minimum behavioral score for an ordinary signature
pub const SIGNATURE_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Minimum behavioral score for an elevated (AI-pattern) signature
pub const ELEVATED_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Severity forced onto every elevated detection
pub const ELEVATED_SEVERITY: u8 = 10;

/// Category reported for elevated detections
pub const ELEVATED_CATEGORY: &str = "AI-Powered Attack";

// ============================================================================
// KILL CHAIN KEYWORDS
// ============================================================================

/// Matched behavior names containing any keyword map to `stage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillChainRule {
    pub stage: KillChainStage,
    pub keywords: Vec<String>,
}

impl KillChainRule {
    fn new(stage: KillChainStage, keywords: &[&str]) -> Self {
        Self {
            stage,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Priority order, first hit wins. Anything else is `Execution`.
pub fn default_kill_chain_rules() -> Vec<KillChainRule> {
    vec![
        KillChainRule::new(
            KillChainStage::Impact,
            &["backup deletion", "backup-deletion", "encryption"],
        ),
        KillChainRule::new(
            KillChainStage::Exfiltration,
            &["exfiltration", "data theft", "data-theft"],
        ),
        KillChainRule::new(
            KillChainStage::LateralMovement,
            &["lateral movement", "lateral-movement", "spreading"],
        ),
        KillChainRule::new(KillChainStage::CredentialAccess, &["credential", "mimikatz"]),
        KillChainRule::new(
            KillChainStage::DefenseEvasion,
            &["evasion", "edr killer", "edr-killer"],
        ),
        KillChainRule::new(KillChainStage::Persistence, &["persistence", "registry"]),
    ]
}

// ============================================================================
// MATCHER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Ordinary signatures below this score are rejected
    pub confidence_threshold: f64,
    /// Elevated signatures below this score are rejected
    pub elevated_threshold: f64,
    /// Run the elevated set at all
    pub enable_elevated: bool,
    pub kill_chain_rules: Vec<KillChainRule>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: SIGNATURE_CONFIDENCE_THRESHOLD,
            elevated_threshold: ELEVATED_CONFIDENCE_THRESHOLD,
            enable_elevated: true,
            kill_chain_rules: default_kill_chain_rules(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_order() {
        let rules = default_kill_chain_rules();
        assert_eq!(rules[0].stage, KillChainStage::Impact);
        assert_eq!(rules.last().unwrap().stage, KillChainStage::Persistence);
        assert_eq!(rules.len(), 6);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let cfg: MatcherConfig = serde_json::from_str(r#"{"confidence_threshold": 0.5}"#).unwrap();
        assert_eq!(cfg.confidence_threshold, 0.5);
        assert_eq!(cfg.elevated_threshold, ELEVATED_CONFIDENCE_THRESHOLD);
        assert!(cfg.enable_elevated);
    }
}
