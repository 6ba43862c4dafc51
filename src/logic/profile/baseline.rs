//! Type Baseline - per-type counts in fixed time buckets
//!
//! Buckets are aligned to `floor(arrival / bucket_secs)`. The bucket holding
//! `now` is the current one; only earlier buckets form the baseline, and
//! buckets with no events of a type count as zero for that type.

use std::collections::{BTreeMap, VecDeque};

use chrono::Timelike;

use super::rules::ProfileConfig;
use crate::constants::DEFAULT_RATE_MAX_ENTRIES;
use crate::logic::event::EventType;
use crate::logic::incident::{
    Incident, IncidentEvidence, IncidentSeverity, ResponseAction, SpikeDetail, ThreatType,
};

/// Current local wall-clock hour (0-23)
pub fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    pub mean: f64,
    pub stdev: f64,
    pub buckets: usize,
}

#[derive(Debug)]
pub struct TypeBaseline {
    buckets: BTreeMap<i64, BTreeMap<EventType, usize>>,
    first_bucket: Option<i64>,
    /// Arrival times for the off-hours burst rule
    recent: VecDeque<f64>,
    config: ProfileConfig,
}

impl TypeBaseline {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            buckets: BTreeMap::new(),
            first_bucket: None,
            recent: VecDeque::new(),
            config: config.clone(),
        }
    }

    fn bucket_of(&self, t: f64) -> i64 {
        (t / self.config.bucket_secs).floor() as i64
    }

    fn window_buckets(&self) -> i64 {
        (self.config.baseline_window_secs / self.config.bucket_secs).ceil() as i64
    }

    pub fn record(&mut self, event_type: &EventType, now: f64) {
        let bucket = self.bucket_of(now);
        self.first_bucket.get_or_insert(bucket);

        *self
            .buckets
            .entry(bucket)
            .or_default()
            .entry(event_type.clone())
            .or_insert(0) += 1;

        self.recent.push_back(now);
        self.prune(now);
    }

    fn prune(&mut self, now: f64) {
        let oldest_kept = self.bucket_of(now) - self.window_buckets();
        self.buckets = self.buckets.split_off(&oldest_kept);

        let cutoff = now - self.config.off_hours_window_secs;
        while let Some(t) = self.recent.front() {
            if *t <= cutoff || self.recent.len() > DEFAULT_RATE_MAX_ENTRIES {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    /// Mean and sample stdev of one type over the completed buckets before `now`.
    /// `None` until enough buckets have elapsed since the first observation.
    pub fn stats(&self, event_type: &EventType, now: f64) -> Option<BucketStats> {
        let first = self.first_bucket?;
        let current = self.bucket_of(now);
        let start = first.max(current - self.window_buckets());
        if current <= start {
            return None;
        }

        let counts: Vec<f64> = (start..current)
            .map(|b| {
                self.buckets
                    .get(&b)
                    .and_then(|m| m.get(event_type))
                    .copied()
                    .unwrap_or(0) as f64
            })
            .collect();

        let n = counts.len();
        if n < self.config.min_baseline_buckets.max(2) {
            return None;
        }

        let mean = counts.iter().sum::<f64>() / n as f64;
        let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

        Some(BucketStats {
            mean,
            stdev: variance.sqrt(),
            buckets: n,
        })
    }

    /// Every type in `current` whose count sits more than the configured
    /// number of standard deviations above its baseline mean
    pub fn spikes(&self, current: &BTreeMap<EventType, usize>, now: f64) -> Vec<SpikeDetail> {
        current
            .iter()
            .filter_map(|(event_type, count)| {
                let stats = self.stats(event_type, now)?;
                if stats.stdev <= 0.0 {
                    return None;
                }
                let z_score = (*count as f64 - stats.mean) / stats.stdev;
                (z_score > self.config.spike_z_threshold).then(|| SpikeDetail {
                    event_type: event_type.clone(),
                    current: *count,
                    baseline_mean: stats.mean,
                    z_score,
                })
            })
            .collect()
    }

    pub fn detect_spike(&self, current: &BTreeMap<EventType, usize>, now: f64) -> Option<Incident> {
        let spikes = self.spikes(current, now);
        if spikes.is_empty() {
            return None;
        }

        Some(
            Incident::new(
                ThreatType::StatisticalAnomaly,
                IncidentSeverity::Medium,
                ResponseAction::Monitor,
                format!("Statistical anomaly detected: {} event type(s) spiking", spikes.len()),
            )
            .with_evidence(IncidentEvidence::Spikes { spikes }),
        )
    }

    /// Events that arrived within the off-hours window ending at `now`
    pub fn recent_count(&self, now: f64) -> usize {
        let window = self.config.off_hours_window_secs;
        self.recent
            .iter()
            .filter(|t| **t <= now && now - **t < window)
            .count()
    }

    pub fn detect_off_hours(&self, hour: u32, now: f64) -> Option<Incident> {
        if !self.config.is_off_hours(hour) {
            return None;
        }

        let recent_events = self.recent_count(now);
        if recent_events <= self.config.off_hours_event_threshold {
            return None;
        }

        Some(
            Incident::new(
                ThreatType::TimeAnomaly,
                IncidentSeverity::Medium,
                ResponseAction::Monitor,
                format!(
                    "Unusual activity during off-hours: {} events in {:.0} minutes",
                    recent_events,
                    self.config.off_hours_window_secs / 60.0
                ),
            )
            .with_evidence(IncidentEvidence::OffHours { hour, recent_events }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline_with(per_bucket: &[usize]) -> TypeBaseline {
        let mut baseline = TypeBaseline::new(&ProfileConfig::default());
        for (bucket, count) in per_bucket.iter().enumerate() {
            for i in 0..*count {
                baseline.record(&EventType::SCAN, bucket as f64 * 60.0 + i as f64);
            }
        }
        baseline
    }

    #[test]
    fn test_stats_need_three_buckets() {
        let baseline = baseline_with(&[2, 3]);
        assert!(baseline.stats(&EventType::SCAN, 130.0).is_none());

        let baseline = baseline_with(&[2, 3, 2]);
        let stats = baseline.stats(&EventType::SCAN, 190.0).unwrap();
        assert_eq!(stats.buckets, 3);
        assert!((stats.mean - 7.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_spike_above_three_sigma() {
        let baseline = baseline_with(&[2, 3, 2, 3, 2]);
        let now = 5.0 * 60.0 + 10.0;

        let mut current = BTreeMap::new();
        current.insert(EventType::SCAN, 10);
        let incident = baseline.detect_spike(&current, now).unwrap();
        assert_eq!(incident.threat_type, ThreatType::StatisticalAnomaly);
        match incident.evidence {
            IncidentEvidence::Spikes { spikes } => {
                assert_eq!(spikes.len(), 1);
                assert!(spikes[0].z_score > 3.0);
            }
            other => panic!("unexpected evidence {:?}", other),
        }

        current.insert(EventType::SCAN, 3);
        assert!(baseline.detect_spike(&current, now).is_none());
    }

    #[test]
    fn test_flat_baseline_never_spikes() {
        let baseline = baseline_with(&[4, 4, 4, 4]);
        let mut current = BTreeMap::new();
        current.insert(EventType::SCAN, 400);
        assert!(baseline.detect_spike(&current, 250.0).is_none());
    }

    #[test]
    fn test_off_hours_burst() {
        let mut baseline = TypeBaseline::new(&ProfileConfig::default());
        for i in 0..51 {
            baseline.record(&EventType::SCAN, 1_000.0 + i as f64);
        }

        let incident = baseline.detect_off_hours(3, 1_051.0).unwrap();
        assert_eq!(incident.threat_type, ThreatType::TimeAnomaly);
        assert_eq!(incident.severity, IncidentSeverity::Medium);

        assert!(baseline.detect_off_hours(14, 1_051.0).is_none());
        assert!(baseline.detect_off_hours(6, 1_051.0).is_none());
        // burst has aged out of the window
        assert!(baseline.detect_off_hours(3, 1_400.0).is_none());
    }

    #[test]
    fn test_local_hour_in_range() {
        assert!(local_hour() < 24);
    }
}
