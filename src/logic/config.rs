//! Engine Configuration
//!
//! One serde-friendly aggregate of every tuning knob. Defaults reproduce the
//! documented constants; `from_env` layers `AEGIS_*` overrides on top.

use serde::{Deserialize, Serialize};

use crate::constants::{env_or, DEFAULT_EVENT_BUFFER_CAPACITY, DEFAULT_HISTORY_CAPACITY};
use crate::logic::ai_pattern::ScorerConfig;
use crate::logic::error::{DetectError, DetectResult};
use crate::logic::processor::ProcessorConfig;
use crate::logic::profile::ProfileConfig;
use crate::logic::rate::RateConfig;
use crate::logic::sequence::SequenceConfig;
use crate::logic::signatures::MatcherConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Detections kept in the ring buffer
    pub detection_capacity: usize,
    /// Recent events kept for the single-event anomaly check
    pub event_buffer_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            detection_capacity: DEFAULT_HISTORY_CAPACITY,
            event_buffer_capacity: DEFAULT_EVENT_BUFFER_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub scorer: ScorerConfig,
    pub rate: RateConfig,
    pub sequence: SequenceConfig,
    pub profile: ProfileConfig,
    pub processor: ProcessorConfig,
    pub history: HistoryConfig,
}

impl EngineConfig {
    // ========================================================================
    // PRESETS
    // ========================================================================

    /// Lower bars everywhere: more detections, more noise
    pub fn high_sensitivity() -> Self {
        let mut config = Self::default();
        config.matcher.confidence_threshold = 0.5;
        config.matcher.elevated_threshold = 0.6;
        config.scorer.match_threshold = 0.5;
        config.sequence = SequenceConfig::high_sensitivity();
        config.profile = ProfileConfig::high_sensitivity();
        config
    }

    /// Higher bars everywhere: fewer false positives
    pub fn low_sensitivity() -> Self {
        let mut config = Self::default();
        config.matcher.confidence_threshold = 0.75;
        config.matcher.elevated_threshold = 0.85;
        config.scorer.match_threshold = 0.75;
        config.sequence = SequenceConfig::low_sensitivity();
        config.profile = ProfileConfig::low_sensitivity();
        config
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.rate.window_secs = env_or("RATE_WINDOW_SECS", config.rate.window_secs);
        config.history.detection_capacity =
            env_or("HISTORY_CAPACITY", config.history.detection_capacity);
        config.processor.poll_interval_ms =
            env_or("POLL_INTERVAL_MS", config.processor.poll_interval_ms);
        config.processor.sweep_interval_ms =
            env_or("SWEEP_INTERVAL_MS", config.processor.sweep_interval_ms);
        config.processor.enable_profiles =
            env_or("ENABLE_PROFILES", config.processor.enable_profiles);
        config.matcher.confidence_threshold =
            env_or("SIGNATURE_THRESHOLD", config.matcher.confidence_threshold);
        config.matcher.elevated_threshold =
            env_or("ELEVATED_THRESHOLD", config.matcher.elevated_threshold);
        config.scorer.match_threshold = env_or("AI_THRESHOLD", config.scorer.match_threshold);
        config.profile.max_profiles = env_or("MAX_PROFILES", config.profile.max_profiles);

        config
    }

    /// Partial JSON is fine; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> DetectResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    pub fn validate(&self) -> DetectResult<()> {
        let thresholds = [
            ("matcher.confidence_threshold", self.matcher.confidence_threshold),
            ("matcher.elevated_threshold", self.matcher.elevated_threshold),
            ("scorer.match_threshold", self.scorer.match_threshold),
        ];
        for (name, value) in thresholds {
            if !(value > 0.0 && value <= 1.0) {
                return Err(DetectError::InvalidConfig(format!("{} must be in (0, 1], got {}", name, value)));
            }
        }

        if self.scorer.weights.all().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DetectError::InvalidConfig("scorer weights must be finite and >= 0".into()));
        }
        if self.scorer.velocity_sample_size == 0 {
            return Err(DetectError::InvalidConfig("scorer.velocity_sample_size must be > 0".into()));
        }

        if !(self.rate.window_secs.is_finite() && self.rate.window_secs > 0.0) {
            return Err(DetectError::InvalidConfig("rate.window_secs must be > 0".into()));
        }
        if self.rate.max_entries == 0 {
            return Err(DetectError::InvalidConfig("rate.max_entries must be > 0".into()));
        }

        if self.sequence.sequences.iter().any(|s| s.pattern.is_empty()) {
            return Err(DetectError::InvalidConfig("sequence patterns must not be empty".into()));
        }

        self.profile.validate()?;

        if self.processor.poll_interval_ms == 0 {
            return Err(DetectError::InvalidConfig("processor.poll_interval_ms must be > 0".into()));
        }
        if self.processor.sweep_interval_ms == 0 {
            return Err(DetectError::InvalidConfig("processor.sweep_interval_ms must be > 0".into()));
        }
        if self.history.detection_capacity == 0 || self.history.event_buffer_capacity == 0 {
            return Err(DetectError::InvalidConfig("history capacities must be > 0".into()));
        }

        Ok(())
    }
}
