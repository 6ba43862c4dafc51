use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use super::pipeline::EventProcessor;
use super::types::{ProcessorConfig, ProcessorState};
use crate::logic::error::DetectError;
use crate::logic::event::{Event, EventType};
use crate::logic::incident::{Incident, ThreatType};
use crate::logic::incident::IncidentEvidence;
use crate::logic::profile::{ProfileConfig, ProfileTracker};
use crate::logic::rate::RateTracker;
use crate::logic::sequence::{SequenceConfig, SequenceMatcher};

fn fixed_clock() -> f64 {
    10_000.0
}

fn processor(sequence: SequenceMatcher) -> (mpsc::Sender<Event>, mpsc::Receiver<Incident>, EventProcessor) {
    let (event_tx, event_rx) = mpsc::channel(64);
    let (incident_tx, incident_rx) = mpsc::channel(64);
    let processor = EventProcessor::new(event_rx, incident_tx, RateTracker::default(), sequence)
        .with_config(ProcessorConfig { poll_interval_ms: 20, ..Default::default() });
    (event_tx, incident_rx, processor)
}

/// Matcher with only the ordered-sequence rules
fn sequence_only() -> SequenceMatcher {
    SequenceMatcher::new(SequenceConfig { thresholds: Vec::new(), ..Default::default() })
}

fn from(ip: &str, t: EventType) -> Event {
    Event::new(1.0, t).with_source_ip(ip)
}

fn midday() -> u32 {
    12
}

fn three_am() -> u32 {
    3
}

/// Profiles on, no threshold or sequence rules
fn profiles_only(hour: fn() -> u32) -> EventProcessor {
    let matcher = SequenceMatcher::new(SequenceConfig {
        thresholds: Vec::new(),
        sequences: Vec::new(),
    });
    processor(matcher).2.with_profiles(ProfileTracker::default()).with_hour_source(hour)
}

// ============================================================================
// PER-EVENT
// ============================================================================

#[test]
fn test_threshold_hit_short_circuits_sequence() {
    let (_tx, _rx, mut p) = processor(SequenceMatcher::default());
    let now = fixed_clock();

    assert!(p.process_event(from("10.0.0.1", EventType::EXPLOIT), now).unwrap().is_none());
    let incident = p.process_event(from("10.0.0.1", EventType::EXFIL), now).unwrap().unwrap();
    // exploit -> exfil is also a sequence hit, but thresholds run first
    assert_eq!(incident.threat_type, ThreatType::DataExfiltration);
}

#[test]
fn test_sequence_check_per_source() {
    let (_tx, _rx, mut p) = processor(sequence_only());
    let now = fixed_clock();

    assert!(p.process_event(from("10.0.0.1", EventType::RECON), now).unwrap().is_none());
    assert!(p.process_event(from("10.0.0.2", EventType::SCAN), now).unwrap().is_none());
    // other source interleaved: 10.0.0.1 has only recon, exploit
    assert!(p.process_event(from("10.0.0.1", EventType::EXPLOIT), now).unwrap().is_none());

    let mut p = processor(sequence_only()).2;
    p.process_event(from("10.0.0.1", EventType::RECON), now).unwrap();
    p.process_event(from("10.0.0.1", EventType::SCAN), now).unwrap();
    let incident = p.process_event(from("10.0.0.1", EventType::EXPLOIT), now).unwrap().unwrap();
    assert_eq!(incident.threat_type, ThreatType::KillChainAttack);
    assert_eq!(incident.source_ip.as_deref(), Some("10.0.0.1"));
}

#[test]
fn test_events_without_source_skip_sequence_check() {
    let (_tx, _rx, mut p) = processor(sequence_only());
    let now = fixed_clock();
    for t in [EventType::RECON, EventType::SCAN, EventType::EXPLOIT] {
        assert!(p.process_event(Event::new(1.0, t), now).unwrap().is_none());
    }
}

#[test]
fn test_window_expiry_breaks_sequence() {
    let (_tx, _rx, mut p) = processor(sequence_only());
    p.process_event(from("10.0.0.1", EventType::EXPLOIT), 100.0).unwrap();
    let late = p.process_event(from("10.0.0.1", EventType::EXFIL), 161.0).unwrap();
    assert!(late.is_none());
}

#[test]
fn test_malformed_event_is_rejected() {
    let (_tx, _rx, mut p) = processor(SequenceMatcher::default());
    let result = p.process_event(Event::new(f64::NAN, EventType::SCAN), fixed_clock());
    assert!(matches!(result, Err(DetectError::MalformedEvent(_))));
}

#[test]
fn test_profiles_fire_when_rules_are_quiet() {
    let (_tx, _rx, p) = processor(sequence_only());
    let mut p = p.with_profiles(ProfileTracker::default());

    // 6 exploits = suspicion 60, spaced past the escalation window
    let mut last = None;
    for i in 0..6 {
        last = p
            .process_event(from("172.16.0.9", EventType::EXPLOIT), 1_000.0 + i as f64 * 61.0)
            .unwrap();
    }
    let incident = last.unwrap();
    assert_eq!(incident.threat_type, ThreatType::SuspiciousBehavior);
}

#[test]
fn test_login_burst_raises_statistical_anomaly() {
    let mut p = profiles_only(midday);
    let login = EventType::new("login").unwrap();
    let mut source = 0;
    let mut feed = |p: &mut EventProcessor, now: f64| {
        source += 1;
        let event = Event::new(1.0, login.clone()).with_source_ip(&format!("10.20.0.{}", source));
        p.process_event(event, now).unwrap()
    };

    // five quiet minutes: 1, 2, 1, 2, 1 logins
    for minute in 0..5 {
        let start = 6_000.0 + minute as f64 * 60.0;
        assert!(feed(&mut p, start).is_none());
        if minute % 2 == 1 {
            assert!(feed(&mut p, start + 30.0).is_none());
        }
    }

    let mut spike = None;
    for i in 0..40 {
        if let Some(incident) = feed(&mut p, 6_300.0 + i as f64 * 0.5) {
            spike = Some(incident);
            break;
        }
    }

    let incident = spike.unwrap();
    assert_eq!(incident.threat_type, ThreatType::StatisticalAnomaly);
    assert!(incident.source_ip.is_none());
    match incident.evidence {
        IncidentEvidence::Spikes { spikes } => assert_eq!(spikes[0].event_type, login),
        other => panic!("unexpected evidence: {:?}", other),
    }
}

#[test]
fn test_off_hours_burst_uses_hour_source() {
    let burst = |hour: fn() -> u32| {
        let mut p = profiles_only(hour);
        let mut last = None;
        for i in 0..51 {
            let event = Event::new(1.0, EventType::RECON).with_source_ip(&format!("10.30.0.{}", i));
            last = p.process_event(event, 7_200.0 + i as f64).unwrap();
        }
        last
    };

    let incident = burst(three_am).unwrap();
    assert_eq!(incident.threat_type, ThreatType::TimeAnomaly);
    assert!(burst(midday).is_none());
}

#[test]
fn test_source_rules_win_over_baseline_rules() {
    let mut p = profiles_only(three_am);
    let mut last = None;
    // 51 exploits inside the escalation window
    for i in 0..51 {
        last = p.process_event(from("10.40.0.1", EventType::EXPLOIT), 8_000.0 + i as f64).unwrap();
    }
    assert_eq!(last.unwrap().threat_type, ThreatType::RapidEscalation);
}

// ============================================================================
// LOOP
// ============================================================================

#[tokio::test]
async fn test_bad_event_does_not_stop_loop() {
    let (event_tx, mut incident_rx, mut p) = processor(SequenceMatcher::default());
    let handle = p.handle();
    let task = tokio::spawn(async move { p.start().await });

    event_tx.send(Event::new(1.0, EventType::SCAN).with_severity(0)).await.unwrap();
    event_tx.send(from("10.9.9.9", EventType::EXFIL)).await.unwrap();

    let incident = timeout(Duration::from_secs(2), incident_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(incident.threat_type, ThreatType::DataExfiltration);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ProcessorState::Running);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.processed, 1);
    assert_eq!(snapshot.incidents, 1);
    assert_eq!(snapshot.window_total, 1);

    handle.stop();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
    assert_eq!(handle.state(), ProcessorState::Stopped);
    assert!(handle.snapshot().await.is_err());
}

#[tokio::test]
async fn test_loop_ends_when_inbound_closes() {
    let (event_tx, _incident_rx, mut p) = processor(SequenceMatcher::default());
    let handle = p.handle();
    let task = tokio::spawn(async move { p.start().await });

    drop(event_tx);
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
    assert_eq!(handle.state(), ProcessorState::Stopped);
}

#[tokio::test]
async fn test_lifecycle_transitions() {
    let (_event_tx, _incident_rx, mut p) = processor(SequenceMatcher::default());
    assert_eq!(p.state(), ProcessorState::Idle);

    let handle = p.handle();
    assert!(matches!(
        handle.snapshot().await,
        Err(DetectError::InvalidState { expected: "running", actual: "idle" })
    ));

    p.stop();
    assert_eq!(p.state(), ProcessorState::Stopped);
    assert!(matches!(p.start().await, Err(DetectError::InvalidState { .. })));
}

#[tokio::test]
async fn test_profile_query_through_handle() {
    let (event_tx, mut incident_rx, p) = processor(sequence_only());
    let mut p = p.with_profiles(ProfileTracker::default());
    let handle = p.handle();
    let task = tokio::spawn(async move { p.start().await });

    event_tx.send(from("10.7.7.7", EventType::SCAN)).await.unwrap();
    event_tx.send(from("10.7.7.7", EventType::SCAN)).await.unwrap();

    // wait until both events are consumed
    let mut profile = None;
    for _ in 0..50 {
        // not running yet until the spawned task gets scheduled
        if let Ok(Some(p)) = handle.profile("10.7.7.7").await {
            if p.event_count == 2 {
                profile = Some(p);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let profile = profile.unwrap();
    assert_eq!(profile.suspicion_score, 10);
    assert!(incident_rx.try_recv().is_err());

    handle.stop();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
}

static SWEEP_NOW: AtomicU64 = AtomicU64::new(0);

fn sweep_clock() -> f64 {
    f64::from_bits(SWEEP_NOW.load(Ordering::SeqCst))
}

#[tokio::test]
async fn test_idle_profiles_swept_without_receive_timeout() {
    SWEEP_NOW.store(100.0f64.to_bits(), Ordering::SeqCst);

    let (event_tx, event_rx) = mpsc::channel(8);
    let (incident_tx, _incident_rx) = mpsc::channel(8);
    // receive timeout far beyond the test; only the sweep timer can expire profiles
    let config = ProcessorConfig {
        poll_interval_ms: 60_000,
        sweep_interval_ms: 10,
        ..Default::default()
    };
    let mut p = EventProcessor::new(event_rx, incident_tx, RateTracker::default(), sequence_only())
        .with_config(config)
        .with_profiles(ProfileTracker::new(ProfileConfig { profile_ttl_secs: 5.0, ..Default::default() }))
        .with_clock(sweep_clock);
    let handle = p.handle();
    let task = tokio::spawn(async move { p.start().await });

    event_tx.send(from("10.8.8.8", EventType::RECON)).await.unwrap();
    let mut seen = false;
    for _ in 0..50 {
        if let Ok(Some(_)) = handle.profile("10.8.8.8").await {
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(seen);

    SWEEP_NOW.store(200.0f64.to_bits(), Ordering::SeqCst);
    let mut swept = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if handle.snapshot().await.unwrap().profiles == 0 {
            swept = true;
            break;
        }
    }
    assert!(swept);

    handle.stop();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
}
