//! Batch Rules - stateless checks over a caller-supplied event slice

use std::collections::{BTreeMap, BTreeSet};

use super::rules::ProfileConfig;
use crate::logic::event::{Event, EventType};
use crate::logic::incident::{Incident, IncidentEvidence, IncidentSeverity, ResponseAction, ThreatType};

/// One source touching more distinct targets than the configured limit.
/// Events without a source or without a target are ignored.
pub fn detect_lateral_movement(events: &[Event], config: &ProfileConfig) -> Option<Incident> {
    let mut by_source: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for event in events {
        if let (Some(ip), Some(target)) = (event.source_ip.as_deref(), event.target.as_deref()) {
            by_source.entry(ip).or_default().insert(target);
        }
    }

    let (ip, targets) = by_source
        .into_iter()
        .find(|(_, targets)| targets.len() > config.lateral_target_threshold)?;

    Some(
        Incident::new(
            ThreatType::LateralMovement,
            IncidentSeverity::Critical,
            ResponseAction::Kill,
            format!("Lateral movement detected: {} accessing {} targets", ip, targets.len()),
        )
        .with_source(Some(ip))
        .with_evidence(IncidentEvidence::TargetCount { targets: targets.len() }),
    )
}

/// Three consecutive events: recon, exploit, then admin-access or config-change
pub fn detect_privilege_escalation(events: &[Event]) -> Option<Incident> {
    let window = events.windows(3).find(|w| {
        w[0].event_type == EventType::RECON
            && w[1].event_type == EventType::EXPLOIT
            && (w[2].event_type == EventType::ADMIN_ACCESS || w[2].event_type == EventType::CONFIG_CHANGE)
    })?;

    Some(
        Incident::new(
            ThreatType::PrivilegeEscalation,
            IncidentSeverity::Critical,
            ResponseAction::Kill,
            "Privilege escalation pattern detected",
        )
        .with_source(window[0].source_ip.as_deref())
        .with_evidence(IncidentEvidence::EventSequence {
            sequence: window.iter().map(|e| e.event_type.clone()).collect(),
        }),
    )
}

/// More distinct source IPs in the batch than the configured limit
pub fn detect_distributed_attack(events: &[Event], config: &ProfileConfig) -> Option<Incident> {
    let sources: BTreeSet<&str> = events.iter().filter_map(|e| e.source_ip.as_deref()).collect();
    if sources.len() <= config.distributed_source_threshold {
        return None;
    }

    Some(
        Incident::new(
            ThreatType::DistributedAttack,
            IncidentSeverity::High,
            ResponseAction::Quarantine,
            format!("Distributed attack detected: {} unique source IPs", sources.len()),
        )
        .with_evidence(IncidentEvidence::SourceCount { sources: sources.len() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lateral_needs_more_than_five_targets() {
        let config = ProfileConfig::default();
        let mut events: Vec<Event> = (0..5)
            .map(|i| {
                Event::new(i as f64, EventType::new("login").unwrap())
                    .with_source_ip("10.1.1.1")
                    .with_target(&format!("host-{}", i))
            })
            .collect();
        assert!(detect_lateral_movement(&events, &config).is_none());

        // repeat target does not count twice
        events.push(Event::new(6.0, EventType::new("login").unwrap()).with_source_ip("10.1.1.1").with_target("host-0"));
        assert!(detect_lateral_movement(&events, &config).is_none());

        // missing target is ignored
        events.push(Event::new(7.0, EventType::new("login").unwrap()).with_source_ip("10.1.1.1"));
        assert!(detect_lateral_movement(&events, &config).is_none());
    }

    #[test]
    fn test_privilege_escalation_requires_adjacency() {
        let seq = |types: &[EventType]| -> Vec<Event> {
            types
                .iter()
                .enumerate()
                .map(|(i, t)| Event::new(i as f64, t.clone()).with_source_ip("10.2.2.2"))
                .collect()
        };

        let hit = seq(&[EventType::SCAN, EventType::RECON, EventType::EXPLOIT, EventType::CONFIG_CHANGE]);
        let incident = detect_privilege_escalation(&hit).unwrap();
        assert_eq!(incident.threat_type, ThreatType::PrivilegeEscalation);
        assert_eq!(incident.source_ip.as_deref(), Some("10.2.2.2"));

        let gap = seq(&[EventType::RECON, EventType::EXPLOIT, EventType::SCAN, EventType::ADMIN_ACCESS]);
        assert!(detect_privilege_escalation(&gap).is_none());
        assert!(detect_privilege_escalation(&[]).is_none());
    }

    #[test]
    fn test_distributed_attack() {
        let config = ProfileConfig::default();
        let events: Vec<Event> = (0..21)
            .map(|i| Event::new(0.0, EventType::SCAN).with_source_ip(&format!("198.51.100.{}", i)))
            .collect();
        let incident = detect_distributed_attack(&events, &config).unwrap();
        assert_eq!(incident.severity, IncidentSeverity::High);
        assert_eq!(incident.action, ResponseAction::Quarantine);
        assert!(detect_distributed_attack(&events[..20], &config).is_none());
    }
}
