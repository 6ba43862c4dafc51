//! Detection Engine
//!
//! Composes the batch detectors behind one handle. Owned by the caller and
//! passed around explicitly; there is no process-wide instance.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::anomaly::AnomalyBaseline;
use super::history::{DetectionHistory, DetectionSummary};
use crate::logic::ai_pattern::{AiPatternScore, AiPatternScorer};
use crate::logic::config::EngineConfig;
use crate::logic::error::{DetectError, DetectResult};
use crate::logic::event::Event;
use crate::logic::incident::Incident;
use crate::logic::processor::EventProcessor;
use crate::logic::profile::{
    detect_distributed_attack, detect_lateral_movement, detect_privilege_escalation, ProfileTracker,
};
use crate::logic::rate::RateTracker;
use crate::logic::sequence::SequenceMatcher;
use crate::logic::signatures::{self, Detection, SignatureStore};

pub struct DetectionEngine {
    store: Arc<SignatureStore>,
    config: EngineConfig,
    scorer: AiPatternScorer,
    baseline: AnomalyBaseline,
    history: Mutex<DetectionHistory>,
    events: Mutex<VecDeque<Event>>,
}

impl DetectionEngine {
    pub fn new(store: Arc<SignatureStore>, config: EngineConfig) -> DetectResult<Self> {
        if store.is_empty() {
            return Err(DetectError::EmptySignatureStore);
        }
        config.validate()?;

        log::info!(
            "[Engine] Ready: {} signatures, elevated matching {}",
            store.len(),
            if config.matcher.enable_elevated { "on" } else { "off" }
        );

        Ok(Self {
            scorer: AiPatternScorer::new(config.scorer.clone()),
            history: Mutex::new(DetectionHistory::new(config.history.detection_capacity)),
            events: Mutex::new(VecDeque::new()),
            baseline: AnomalyBaseline::default(),
            store,
            config,
        })
    }

    /// Built-in signature database with default config
    pub fn with_defaults() -> DetectResult<Self> {
        Self::new(Arc::new(SignatureStore::with_defaults()), EngineConfig::default())
    }

    pub fn with_baseline(mut self, baseline: AnomalyBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn store(&self) -> &Arc<SignatureStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // BATCH
    // ========================================================================

    /// Match a batch against every signature; result is recorded in history
    pub fn analyze_behavior(&self, events: &[Event]) -> Vec<Detection> {
        let detections = signatures::analyze_behavior(events, &self.store, &self.config.matcher);

        for d in &detections {
            log::warn!(
                "[Engine] {} ({}) confidence {:.2}, stage {}, action {}",
                d.threat_name,
                d.category,
                d.confidence,
                d.kill_chain_stage,
                d.recommended_action
            );
        }

        self.history.lock().record(&detections);
        detections
    }

    /// Composite machine-driven attack score; pure, nothing recorded
    pub fn score_ai_pattern(&self, events: &[Event]) -> AiPatternScore {
        self.scorer.score(events)
    }

    /// Lateral movement, privilege escalation and distributed-source rules
    /// over one batch, in that order
    pub fn batch_anomalies(&self, events: &[Event]) -> Vec<Incident> {
        let profile = &self.config.profile;
        [
            detect_lateral_movement(events, profile),
            detect_privilege_escalation(events),
            detect_distributed_attack(events, profile),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    // ========================================================================
    // SINGLE EVENT
    // ========================================================================

    /// Append to the bounded recent-event buffer used by `check_anomaly`
    pub fn add_event(&self, event: Event) {
        let cap = self.config.history.event_buffer_capacity;
        let mut events = self.events.lock();
        while events.len() >= cap {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Human-readable findings for one event, or `None` if it looks normal
    pub fn check_anomaly(&self, event: &Event) -> Option<String> {
        let events = self.events.lock();
        self.baseline.check(event, events.iter())
    }

    pub fn buffered_events(&self) -> usize {
        self.events.lock().len()
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    pub fn detection_summary(&self) -> DetectionSummary {
        self.history.lock().summary()
    }

    /// Up to `n` detections, newest first
    pub fn recent_detections(&self, n: usize) -> Vec<Detection> {
        self.history.lock().recent(n)
    }

    // ========================================================================
    // STREAMING
    // ========================================================================

    /// Processor wired with this engine's rate, sequence, profile and
    /// processor settings
    pub fn event_processor(
        &self,
        inbound: mpsc::Receiver<Event>,
        outbound: mpsc::Sender<Incident>,
    ) -> EventProcessor {
        let processor = EventProcessor::new(
            inbound,
            outbound,
            RateTracker::new(self.config.rate.clone()),
            SequenceMatcher::new(self.config.sequence.clone()),
        );

        if self.config.processor.enable_profiles {
            processor
                .with_profiles(ProfileTracker::new(self.config.profile.clone()))
                .with_config(self.config.processor.clone())
        } else {
            processor.with_config(self.config.processor.clone())
        }
    }
}
