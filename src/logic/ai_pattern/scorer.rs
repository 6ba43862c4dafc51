//! Composite AI-Pattern Scorer
//!
//! Pure function over a caller-supplied batch. No hidden state: scoring the
//! same batch twice yields the same output.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::rules::{ScorerConfig, TimingMode, FIXED_TIMING_SCORE, MIN_TIMING_EVENTS, MIN_VELOCITY_EVENTS};
use crate::constants::SCORE_EPSILON;
use crate::logic::event::Event;

/// Label attached to a positive determination
pub const AI_THREAT_LABEL: &str = "AI-Powered APT";

const MITIGATION_PLAYBOOK: &[&str] = &[
    "IMMEDIATE: Rate limit all API endpoints to prevent AI velocity",
    "IMMEDIATE: Enable CAPTCHA on authentication endpoints",
    "IMMEDIATE: Monitor for rapid sequential system calls",
    "SHORT-TERM: Implement behavioral biometrics (detect non-human patterns)",
    "SHORT-TERM: Deploy autonomous response for machine-speed containment",
    "SHORT-TERM: Alert SOC team - possible state-sponsored APT",
    "LONG-TERM: Implement honeypots to detect automated scanning",
    "LONG-TERM: Network segmentation to limit autonomous lateral movement",
    "LONG-TERM: Zero-trust architecture with continuous authentication",
];

// ============================================================================
// SIGNALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    BurstVelocity,
    SequentialInspection,
    CredentialHarvesting,
    MultiPhase,
    TimingRegularity,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::BurstVelocity,
        Signal::SequentialInspection,
        Signal::CredentialHarvesting,
        Signal::MultiPhase,
        Signal::TimingRegularity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::BurstVelocity => "burst_velocity",
            Signal::SequentialInspection => "sequential_inspection",
            Signal::CredentialHarvesting => "credential_harvesting",
            Signal::MultiPhase => "multi_phase",
            Signal::TimingRegularity => "timing_regularity",
        }
    }
}

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPatternScore {
    pub is_match: bool,
    /// Weighted blend, 0.0 - 1.0
    pub confidence: f64,
    /// Every sub-signal, keyed by `Signal::as_str`
    pub signals: BTreeMap<String, f64>,
    pub threat_label: Option<String>,
    pub mitigation: Vec<String>,
}

impl AiPatternScore {
    pub fn signal(&self, signal: Signal) -> f64 {
        self.signals.get(signal.as_str()).copied().unwrap_or(0.0)
    }

    /// Human-readable report for analysts
    pub fn report(&self) -> String {
        if !self.is_match {
            return "No AI-powered attack detected".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "AI-POWERED ATTACK DETECTED");
        let _ = writeln!(
            out,
            "Classification: {}",
            self.threat_label.as_deref().unwrap_or(AI_THREAT_LABEL)
        );
        let _ = writeln!(out, "Confidence: {:.1}%", self.confidence * 100.0);
        let _ = writeln!(out, "Signals:");
        for signal in Signal::ALL {
            let _ = writeln!(out, "  - {}: {:.1}%", signal.as_str(), self.signal(signal) * 100.0);
        }
        let _ = writeln!(out, "Recommended mitigation:");
        for (i, step) in self.mitigation.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, step);
        }
        out
    }
}

// ============================================================================
// SCORER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AiPatternScorer {
    config: ScorerConfig,
}

impl AiPatternScorer {
    pub fn new(config: ScorerConfig) -> Self {
        let mut config = config;
        // keyword tests run on lowercased text
        for k in config
            .inspection_keywords
            .iter_mut()
            .chain(config.credential_keywords.iter_mut())
            .chain(config.phases.iter_mut().flat_map(|p| p.keywords.iter_mut()))
        {
            *k = k.to_lowercase();
        }
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn score(&self, events: &[Event]) -> AiPatternScore {
        let valid: Vec<&Event> = events.iter().filter(|e| e.validate().is_ok()).collect();
        if valid.len() < events.len() {
            log::debug!("[AiPattern] Ignoring {} malformed events", events.len() - valid.len());
        }

        let texts: Vec<String> = valid.iter().map(|e| e.searchable_text()).collect();

        let values = [
            self.burst_velocity(valid.len()),
            self.sequential_inspection(&texts),
            self.credential_harvesting(&texts),
            self.multi_phase(&texts),
            self.timing_regularity(&valid),
        ];

        let confidence = values
            .iter()
            .zip(self.config.weights.all())
            .map(|(value, weight)| value * weight)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let is_match = !valid.is_empty() && confidence + SCORE_EPSILON >= self.config.match_threshold;

        let signals = Signal::ALL
            .iter()
            .zip(values)
            .map(|(signal, value)| (signal.as_str().to_string(), value))
            .collect();

        AiPatternScore {
            is_match,
            confidence,
            signals,
            threat_label: is_match.then(|| AI_THREAT_LABEL.to_string()),
            mitigation: if is_match {
                MITIGATION_PLAYBOOK.iter().map(|s| s.to_string()).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Machine-speed bursts: size of the trailing sample
    fn burst_velocity(&self, len: usize) -> f64 {
        if len < MIN_VELOCITY_EVENTS {
            return 0.0;
        }
        let recent = len.min(self.config.velocity_sample_size);
        if recent > 100 {
            1.0
        } else if recent > 50 {
            0.8
        } else if recent > 20 {
            0.5
        } else {
            0.0
        }
    }

    fn sequential_inspection(&self, texts: &[String]) -> f64 {
        let hits = count_matching(texts, &self.config.inspection_keywords);
        if hits >= 5 {
            1.0
        } else if hits >= 3 {
            0.7
        } else if hits >= 1 {
            0.4
        } else {
            0.0
        }
    }

    fn credential_harvesting(&self, texts: &[String]) -> f64 {
        let hits = count_matching(texts, &self.config.credential_keywords);
        if hits >= 10 {
            1.0
        } else if hits >= 5 {
            0.7
        } else if hits >= 2 {
            0.4
        } else {
            0.0
        }
    }

    fn multi_phase(&self, texts: &[String]) -> f64 {
        let mut phases = HashSet::new();
        for text in texts {
            for phase in &self.config.phases {
                if phase.keywords.iter().any(|k| text.contains(k.as_str())) {
                    phases.insert(phase.name.as_str());
                }
            }
        }
        match phases.len() {
            n if n >= 4 => 1.0,
            3 => 0.7,
            2 => 0.4,
            _ => 0.0,
        }
    }

    fn timing_regularity(&self, events: &[&Event]) -> f64 {
        if events.len() < MIN_TIMING_EVENTS {
            return 0.0;
        }
        match self.config.timing_mode {
            TimingMode::Fixed => FIXED_TIMING_SCORE,
            TimingMode::InterArrival => inter_arrival_regularity(events),
        }
    }
}

fn count_matching(texts: &[String], keywords: &[String]) -> usize {
    texts
        .iter()
        .filter(|t| keywords.iter().any(|k| t.contains(k.as_str())))
        .count()
}

/// Jitter tiers borrowed from beacon detection: the lower the coefficient of
/// variation of inter-arrival gaps, the more machine-like the stream.
fn inter_arrival_regularity(events: &[&Event]) -> f64 {
    let mut times: Vec<f64> = events.iter().map(|e| e.timestamp).collect();
    times.sort_by(f64::total_cmp);

    let deltas: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let n = deltas.len() as f64;
    let mean = deltas.iter().sum::<f64>() / n;
    if mean <= f64::EPSILON {
        // everything arrived at once
        return 1.0;
    }

    let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;

    if cv < 0.05 {
        1.0
    } else if cv < 0.15 {
        0.8
    } else if cv < 0.5 {
        0.5
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
