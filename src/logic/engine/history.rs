//! Detection history: bounded ring plus lifetime counters
//!
//! The ring only feeds `recent`; the summary is kept from counters so it
//! stays exact after old detections fall off the ring.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::logic::signatures::Detection;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total: usize,
    /// Keyed by signature severity (1-10)
    pub counts_by_severity: BTreeMap<u8, usize>,
    pub counts_by_category: BTreeMap<String, usize>,
    pub elevated_count: usize,
}

#[derive(Debug)]
pub struct DetectionHistory {
    ring: VecDeque<Detection>,
    capacity: usize,
    summary: DetectionSummary,
}

impl DetectionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(capacity.min(1_024)),
            capacity: capacity.max(1),
            summary: DetectionSummary::default(),
        }
    }

    pub fn record(&mut self, detections: &[Detection]) {
        for detection in detections {
            self.summary.total += 1;
            *self.summary.counts_by_severity.entry(detection.severity).or_insert(0) += 1;
            *self
                .summary
                .counts_by_category
                .entry(detection.category.clone())
                .or_insert(0) += 1;
            if detection.is_elevated {
                self.summary.elevated_count += 1;
            }

            if self.ring.len() >= self.capacity {
                self.ring.pop_front();
            }
            self.ring.push_back(detection.clone());
        }
    }

    pub fn summary(&self) -> DetectionSummary {
        self.summary.clone()
    }

    /// Up to `n` detections, newest first
    pub fn recent(&self, n: usize) -> Vec<Detection> {
        self.ring.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::signatures::{KillChainStage, RecommendedAction};

    fn detection(name: &str, category: &str, severity: u8, elevated: bool) -> Detection {
        Detection {
            threat_name: name.to_string(),
            category: category.to_string(),
            confidence: 0.8,
            severity,
            matched_behavior_names: Vec::new(),
            raw_behavioral_score: 0.8,
            is_elevated: elevated,
            kill_chain_stage: KillChainStage::Execution,
            recommended_action: RecommendedAction::MonitorClosely,
            evidence_events: Vec::new(),
            detection_time: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_summary_survives_ring_eviction() {
        let mut history = DetectionHistory::new(2);
        history.record(&[
            detection("A", "Ransomware", 10, false),
            detection("B", "Trojan", 9, false),
            detection("C", "AI-Powered Attack", 10, true),
        ]);

        assert_eq!(history.len(), 2);
        let summary = history.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.counts_by_severity.get(&10), Some(&2));
        assert_eq!(summary.counts_by_category.get("Trojan"), Some(&1));
        assert_eq!(summary.elevated_count, 1);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut history = DetectionHistory::new(10);
        history.record(&[detection("A", "X", 5, false), detection("B", "X", 5, false)]);
        let names: Vec<String> = history.recent(5).into_iter().map(|d| d.threat_name).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(history.recent(1).len(), 1);
    }
}
