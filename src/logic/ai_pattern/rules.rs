//! AI-Pattern Scoring Rules
//!
//! Tuning constants for the composite scorer. They have no derivation beyond
//! field experience, so every one of them is overridable via `ScorerConfig`.

use serde::{Deserialize, Serialize};

// ============================================================================
// WEIGHTS
// ============================================================================

pub const VELOCITY_WEIGHT: f64 = 0.3;
pub const INSPECTION_WEIGHT: f64 = 0.2;
pub const CREDENTIAL_WEIGHT: f64 = 0.2;
pub const MULTI_PHASE_WEIGHT: f64 = 0.2;
pub const TIMING_WEIGHT: f64 = 0.1;

/// Weighted sum at or above this = machine-driven
pub const AI_MATCH_THRESHOLD: f64 = 0.6;

// ============================================================================
// SIGNAL PARAMETERS
// ============================================================================

/// Trailing events inspected by the burst-velocity signal.
/// Must exceed the top tier (100) or the 1.0 tier is unreachable.
pub const VELOCITY_SAMPLE_SIZE: usize = 1_000;

/// Below this batch size the velocity signal is 0
pub const MIN_VELOCITY_EVENTS: usize = 10;

/// Below this batch size the timing signal is 0
pub const MIN_TIMING_EVENTS: usize = 5;

/// Score used by `TimingMode::Fixed`
pub const FIXED_TIMING_SCORE: f64 = 0.5;

pub const INSPECTION_KEYWORDS: &[&str] = &[
    "scan", "inspect", "enumerate", "discover",
    "database", "admin", "credential", "config",
];

pub const CREDENTIAL_KEYWORDS: &[&str] = &[
    "password", "credential", "token", "secret",
    "auth", "login", "session", "api_key",
];

// ============================================================================
// ATTACK PHASES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackPhase {
    pub name: String,
    pub keywords: Vec<String>,
}

impl AttackPhase {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

pub fn default_phases() -> Vec<AttackPhase> {
    vec![
        AttackPhase::new("recon", &["scan", "enum", "discover"]),
        AttackPhase::new("weaponization", &["exploit", "payload"]),
        AttackPhase::new("exploitation", &["execute", "inject", "overflow"]),
        AttackPhase::new("persistence", &["backdoor", "persist", "schedule"]),
        AttackPhase::new("exfil", &["exfil", "extract", "download", "upload"]),
    ]
}

// ============================================================================
// CONFIG
// ============================================================================

/// How the timing-regularity signal is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Constant `FIXED_TIMING_SCORE` for any batch of 5+ events
    Fixed,
    /// Coefficient of variation of inter-arrival deltas; lower = more regular
    InterArrival,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub burst_velocity: f64,
    pub sequential_inspection: f64,
    pub credential_harvesting: f64,
    pub multi_phase: f64,
    pub timing_regularity: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            burst_velocity: VELOCITY_WEIGHT,
            sequential_inspection: INSPECTION_WEIGHT,
            credential_harvesting: CREDENTIAL_WEIGHT,
            multi_phase: MULTI_PHASE_WEIGHT,
            timing_regularity: TIMING_WEIGHT,
        }
    }
}

impl SignalWeights {
    pub fn all(&self) -> [f64; 5] {
        [
            self.burst_velocity,
            self.sequential_inspection,
            self.credential_harvesting,
            self.multi_phase,
            self.timing_regularity,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub weights: SignalWeights,
    pub match_threshold: f64,
    pub velocity_sample_size: usize,
    pub inspection_keywords: Vec<String>,
    pub credential_keywords: Vec<String>,
    pub phases: Vec<AttackPhase>,
    pub timing_mode: TimingMode,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            match_threshold: AI_MATCH_THRESHOLD,
            velocity_sample_size: VELOCITY_SAMPLE_SIZE,
            inspection_keywords: INSPECTION_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            credential_keywords: CREDENTIAL_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            phases: default_phases(),
            timing_mode: TimingMode::InterArrival,
        }
    }
}

impl ScorerConfig {
    /// The scorer exactly as first deployed: constant timing signal
    pub fn legacy() -> Self {
        Self {
            timing_mode: TimingMode::Fixed,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let sum: f64 = SignalWeights::default().all().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_five_phases() {
        assert_eq!(default_phases().len(), 5);
        assert_eq!(ScorerConfig::legacy().timing_mode, TimingMode::Fixed);
    }
}
