//! Profile Tracker
//!
//! Owns per-source profiles and the per-type baseline. Single writer: the
//! processor task, or a caller holding `&mut`.
//!
//! A recency index ordered by `last_seen` mirrors the profile map, so LRU
//! eviction and the TTL sweep only touch the oldest entries.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::baseline::TypeBaseline;
use super::rules::{ProfileConfig, FAILURE_MARKERS};
use super::types::SourceProfile;
use crate::logic::event::{Event, EventType};
use crate::logic::incident::{Incident, IncidentEvidence, IncidentSeverity, ResponseAction, ThreatType};

#[derive(Debug)]
pub struct ProfileTracker {
    profiles: HashMap<String, SourceProfile>,
    /// `(recency_key(last_seen), ip)` for every profile, oldest first
    recency: BTreeSet<(u64, String)>,
    baseline: TypeBaseline,
    config: ProfileConfig,
}

impl Default for ProfileTracker {
    fn default() -> Self {
        Self::new(ProfileConfig::default())
    }
}

impl ProfileTracker {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            profiles: HashMap::new(),
            recency: BTreeSet::new(),
            baseline: TypeBaseline::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    // ========================================================================
    // UPDATE
    // ========================================================================

    /// Fold one event into its source profile and the type baseline.
    /// Events without a source only feed the baseline.
    pub fn observe(&mut self, event: &Event, now: f64) {
        self.baseline.record(&event.event_type, now);

        let Some(ip) = event.source_ip.as_deref() else {
            return;
        };

        match self.profiles.get(ip) {
            Some(existing) => {
                self.recency.remove(&(recency_key(existing.last_seen), ip.to_string()));
            }
            None if self.profiles.len() >= self.config.max_profiles => self.evict_least_recent(),
            None => {}
        }
        self.recency.insert((recency_key(now), ip.to_string()));

        let high_risk = self.config.high_risk_points;
        let scan = self.config.scan_points;
        let profile = self
            .profiles
            .entry(ip.to_string())
            .or_insert_with(|| SourceProfile::new(ip, now));

        profile.last_seen = now;
        profile.event_count += 1;
        *profile.event_types.entry(event.event_type.clone()).or_insert(0) += 1;

        let t = &event.event_type;
        if *t == EventType::CRED_GUESS || *t == EventType::EXPLOIT || *t == EventType::EXFIL {
            profile.suspicion_score += high_risk;
        } else if *t == EventType::SCAN {
            profile.suspicion_score += scan;
        }

        if FAILURE_MARKERS.iter().any(|m| t.contains(m)) {
            profile.failed_attempts += 1;
        }
    }

    /// Drop profiles idle longer than the TTL. Returns how many were removed.
    pub fn sweep(&mut self, now: f64) -> usize {
        let ttl = self.config.profile_ttl_secs;
        let mut removed = 0;

        while let Some((_, ip)) = self.recency.first() {
            if self.profiles.get(ip).is_some_and(|p| p.idle(now) <= ttl) {
                break;
            }
            if let Some((_, ip)) = self.recency.pop_first() {
                if self.profiles.remove(&ip).is_some() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            log::debug!("[Profiles] Swept {} idle profiles", removed);
        }
        removed
    }

    fn evict_least_recent(&mut self) {
        if let Some((_, ip)) = self.recency.pop_first() {
            self.profiles.remove(&ip);
            log::debug!("[Profiles] Evicted least-recent profile {}", ip);
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn profile(&self, source_ip: &str) -> Option<&SourceProfile> {
        self.profiles.get(source_ip)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn baseline(&self) -> &TypeBaseline {
        &self.baseline
    }

    // ========================================================================
    // PER-SOURCE RULES
    // ========================================================================

    /// First per-source rule that fires: escalation, suspicion, failures
    pub fn check_source(&self, source_ip: &str, now: f64) -> Option<Incident> {
        self.check_rapid_escalation(source_ip, now)
            .or_else(|| self.check_suspicion(source_ip))
            .or_else(|| self.check_failures(source_ip))
    }

    pub fn check_rapid_escalation(&self, source_ip: &str, now: f64) -> Option<Incident> {
        let p = self.profiles.get(source_ip)?;
        if p.event_count < self.config.rapid_escalation_events
            || p.age(now) > self.config.rapid_escalation_window_secs
        {
            return None;
        }

        Some(
            Incident::new(
                ThreatType::RapidEscalation,
                IncidentSeverity::Critical,
                ResponseAction::Quarantine,
                format!(
                    "Rapid activity escalation: {} events in {:.0}s",
                    p.event_count,
                    p.age(now)
                ),
            )
            .with_source(Some(source_ip))
            .with_evidence(profile_evidence(p)),
        )
    }

    pub fn check_suspicion(&self, source_ip: &str) -> Option<Incident> {
        let p = self.profiles.get(source_ip)?;
        if p.suspicion_score <= self.config.suspicion_threshold {
            return None;
        }

        Some(
            Incident::new(
                ThreatType::SuspiciousBehavior,
                IncidentSeverity::High,
                ResponseAction::Quarantine,
                format!("High suspicious score: {}", p.suspicion_score),
            )
            .with_source(Some(source_ip))
            .with_evidence(profile_evidence(p)),
        )
    }

    pub fn check_failures(&self, source_ip: &str) -> Option<Incident> {
        let p = self.profiles.get(source_ip)?;
        if p.failed_attempts <= self.config.failure_threshold {
            return None;
        }

        Some(
            Incident::new(
                ThreatType::RepeatedFailures,
                IncidentSeverity::Medium,
                ResponseAction::Monitor,
                format!("Repeated failed attempts: {}", p.failed_attempts),
            )
            .with_source(Some(source_ip))
            .with_evidence(profile_evidence(p)),
        )
    }

    // ========================================================================
    // BASELINE RULES
    // ========================================================================

    /// Statistical spike of `current` counts against the type baseline
    pub fn check_spike(&self, current: &BTreeMap<EventType, usize>, now: f64) -> Option<Incident> {
        self.baseline.detect_spike(current, now)
    }

    /// Off-hours burst for an explicit local hour
    pub fn check_off_hours(&self, hour: u32, now: f64) -> Option<Incident> {
        self.baseline.detect_off_hours(hour, now)
    }
}

/// Order-preserving map from an arrival time to `u64`, negatives included
fn recency_key(t: f64) -> u64 {
    let bits = t.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

fn profile_evidence(p: &SourceProfile) -> IncidentEvidence {
    IncidentEvidence::Profile {
        event_count: p.event_count,
        suspicion_score: p.suspicion_score,
        failed_attempts: p.failed_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(t: EventType, ip: &str) -> Event {
        Event::new(0.0, t).with_source_ip(ip)
    }

    #[test]
    fn test_observe_scores_and_counts() {
        let mut tracker = ProfileTracker::default();
        tracker.observe(&ev(EventType::SCAN, "10.0.0.1"), 1.0);
        tracker.observe(&ev(EventType::EXPLOIT, "10.0.0.1"), 2.0);
        tracker.observe(&ev(EventType::new("login-failed").unwrap(), "10.0.0.1"), 3.0);

        let p = tracker.profile("10.0.0.1").unwrap();
        assert_eq!(p.event_count, 3);
        assert_eq!(p.suspicion_score, 15);
        assert_eq!(p.failed_attempts, 1);
        assert_eq!(p.first_seen, 1.0);
        assert_eq!(p.last_seen, 3.0);
        assert_eq!(p.event_types.get(&EventType::SCAN), Some(&1));
    }

    #[test]
    fn test_events_without_source_skip_profiles() {
        let mut tracker = ProfileTracker::default();
        tracker.observe(&Event::new(0.0, EventType::SCAN), 1.0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_rapid_escalation() {
        let mut tracker = ProfileTracker::default();
        for i in 0..20 {
            tracker.observe(&ev(EventType::RECON, "10.0.0.2"), 100.0 + i as f64);
        }
        let incident = tracker.check_rapid_escalation("10.0.0.2", 119.0).unwrap();
        assert_eq!(incident.threat_type, ThreatType::RapidEscalation);
        assert_eq!(incident.severity, IncidentSeverity::Critical);
        assert_eq!(incident.action, ResponseAction::Quarantine);

        // same count, but spread past the window
        assert!(tracker.check_rapid_escalation("10.0.0.2", 161.0).is_none());
    }

    #[test]
    fn test_suspicion_is_strictly_above_threshold() {
        let mut tracker = ProfileTracker::default();
        for i in 0..5 {
            tracker.observe(&ev(EventType::EXPLOIT, "10.0.0.3"), i as f64);
        }
        assert!(tracker.check_suspicion("10.0.0.3").is_none());

        tracker.observe(&ev(EventType::EXFIL, "10.0.0.3"), 6.0);
        let incident = tracker.check_suspicion("10.0.0.3").unwrap();
        assert_eq!(incident.reason, "High suspicious score: 60");
        assert_eq!(incident.source_ip.as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn test_repeated_failures() {
        let mut tracker = ProfileTracker::default();
        let denied = EventType::new("access-denied").unwrap();
        for i in 0..11 {
            tracker.observe(&ev(denied.clone(), "10.0.0.4"), i as f64 * 100.0);
        }
        let incident = tracker.check_source("10.0.0.4", 1_000.0).unwrap();
        assert_eq!(incident.threat_type, ThreatType::RepeatedFailures);
        assert_eq!(incident.action, ResponseAction::Monitor);
    }

    #[test]
    fn test_unknown_source_is_quiet() {
        let tracker = ProfileTracker::default();
        assert!(tracker.check_source("192.0.2.1", 0.0).is_none());
    }

    #[test]
    fn test_sweep_drops_idle_profiles() {
        let mut tracker = ProfileTracker::default();
        tracker.observe(&ev(EventType::SCAN, "10.0.0.5"), 0.0);
        tracker.observe(&ev(EventType::SCAN, "10.0.0.6"), 3_000.0);

        assert_eq!(tracker.sweep(3_601.0), 1);
        assert!(tracker.profile("10.0.0.5").is_none());
        assert!(tracker.profile("10.0.0.6").is_some());
    }

    #[test]
    fn test_max_profiles_evicts_least_recent() {
        let mut tracker = ProfileTracker::new(ProfileConfig { max_profiles: 2, ..Default::default() });
        tracker.observe(&ev(EventType::SCAN, "a"), 1.0);
        tracker.observe(&ev(EventType::SCAN, "b"), 2.0);
        tracker.observe(&ev(EventType::SCAN, "a"), 3.0);
        tracker.observe(&ev(EventType::SCAN, "c"), 4.0);

        assert_eq!(tracker.len(), 2);
        assert!(tracker.profile("b").is_none());
        assert!(tracker.profile("a").is_some());
        assert!(tracker.profile("c").is_some());
    }

    #[test]
    fn test_eviction_follows_latest_activity() {
        let mut tracker = ProfileTracker::new(ProfileConfig { max_profiles: 3, ..Default::default() });
        for (i, ip) in ["a", "b", "c", "a", "b", "a"].iter().enumerate() {
            tracker.observe(&ev(EventType::SCAN, ip), i as f64);
        }

        // c last seen at 2.0, b at 4.0, a at 5.0
        tracker.observe(&ev(EventType::SCAN, "d"), 6.0);
        assert!(tracker.profile("c").is_none());
        tracker.observe(&ev(EventType::SCAN, "e"), 7.0);
        assert!(tracker.profile("b").is_none());

        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.recency.len(), tracker.len());
        assert_eq!(tracker.profile("a").unwrap().event_count, 3);
    }

    #[test]
    fn test_sweep_keeps_index_in_step() {
        let mut tracker = ProfileTracker::default();
        tracker.observe(&ev(EventType::SCAN, "10.0.0.7"), 0.0);
        tracker.observe(&ev(EventType::SCAN, "10.0.0.8"), 10.0);
        // refreshed, so no longer the oldest
        tracker.observe(&ev(EventType::SCAN, "10.0.0.7"), 3_000.0);

        assert_eq!(tracker.sweep(3_700.0), 1);
        assert!(tracker.profile("10.0.0.8").is_none());
        assert!(tracker.profile("10.0.0.7").is_some());
        assert_eq!(tracker.recency.len(), 1);

        assert_eq!(tracker.sweep(10_000.0), 1);
        assert!(tracker.is_empty());
        assert!(tracker.recency.is_empty());
    }

    #[test]
    fn test_recency_key_orders_like_time() {
        let times = [-5.0, -0.5, 0.0, 0.25, 1.0, 1_700_000_000.5];
        for pair in times.windows(2) {
            assert!(recency_key(pair[0]) < recency_key(pair[1]));
        }
    }
}
