//! Signature Matcher
//!
//! CORE LOGIC - weighted behavioral matching.
//! Input: batch of events + signature. Output: Option<Detection>.
//! Deterministic for identical input (apart from `detection_time`).

use chrono::Utc;

use super::rules::{MatcherConfig, ELEVATED_CATEGORY, ELEVATED_SEVERITY, KillChainRule};
use super::store::SignatureStore;
use super::types::{Detection, KillChainStage, RecommendedAction, Signature};
use crate::constants::SCORE_EPSILON;
use crate::logic::event::Event;

// ============================================================================
// PREPARED EVENTS
// ============================================================================

/// Event with its match surfaces lowercased once per batch, so each
/// signature does not redo the work.
#[derive(Debug)]
pub struct PreparedEvent<'a> {
    pub event: &'a Event,
    surfaces: Vec<String>,
}

impl<'a> PreparedEvent<'a> {
    pub fn new(event: &'a Event) -> Self {
        Self {
            event,
            surfaces: event.match_surfaces().map(str::to_lowercase).collect(),
        }
    }

    /// `keyword` must already be lowercase
    fn matches(&self, keyword: &str) -> bool {
        self.surfaces.iter().any(|s| s.contains(keyword))
    }
}

pub fn prepare_events<'a, I>(events: I) -> Vec<PreparedEvent<'a>>
where
    I: IntoIterator<Item = &'a Event>,
{
    events.into_iter().map(PreparedEvent::new).collect()
}

// ============================================================================
// WEIGHTED MATCHING
// ============================================================================

struct BehaviorScore {
    matched_behaviors: Vec<String>,
    evidence: Vec<Event>,
    score: f64,
}

/// Each behavior is credited at most once: the first event matching any of
/// its keywords becomes the evidence and the scan moves to the next behavior.
fn score_behaviors(events: &[PreparedEvent<'_>], signature: &Signature) -> BehaviorScore {
    let mut total_weight = 0.0;
    let mut matched_weight = 0.0;
    let mut matched_behaviors = Vec::new();
    let mut evidence = Vec::new();

    for behavior in &signature.behaviors {
        total_weight += behavior.weight;

        let keywords: Vec<String> = behavior
            .indicator_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        let hit = events
            .iter()
            .find(|prepared| keywords.iter().any(|k| prepared.matches(k)));

        if let Some(prepared) = hit {
            matched_weight += behavior.weight;
            matched_behaviors.push(behavior.name.clone());
            evidence.push(prepared.event.clone());
        }
    }

    let score = if total_weight > 0.0 {
        (matched_weight / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    BehaviorScore { matched_behaviors, evidence, score }
}

fn passes(score: f64, threshold: f64) -> bool {
    score > 0.0 && score + SCORE_EPSILON >= threshold
}

/// Match a batch against an ordinary signature
pub fn match_signature(
    events: &[Event],
    signature: &Signature,
    config: &MatcherConfig,
) -> Option<Detection> {
    match_prepared(&prepare_events(events), signature, config)
}

pub(crate) fn match_prepared(
    events: &[PreparedEvent<'_>],
    signature: &Signature,
    config: &MatcherConfig,
) -> Option<Detection> {
    let result = score_behaviors(events, signature);
    if !passes(result.score, config.confidence_threshold) {
        return None;
    }

    let stage = kill_chain_stage(&result.matched_behaviors, &config.kill_chain_rules);
    let action = recommended_action(signature.severity, result.score);

    Some(Detection {
        threat_name: signature.name.clone(),
        category: signature.category.clone(),
        confidence: result.score,
        severity: signature.severity,
        matched_behavior_names: result.matched_behaviors,
        raw_behavioral_score: result.score,
        is_elevated: false,
        kill_chain_stage: stage,
        recommended_action: action,
        evidence_events: result.evidence,
        detection_time: Utc::now(),
    })
}

/// Match a batch against an elevated (AI-pattern) signature.
/// Higher bar, fixed severity, stage and action.
pub fn match_elevated(
    events: &[Event],
    signature: &Signature,
    config: &MatcherConfig,
) -> Option<Detection> {
    match_elevated_prepared(&prepare_events(events), signature, config)
}

pub(crate) fn match_elevated_prepared(
    events: &[PreparedEvent<'_>],
    signature: &Signature,
    config: &MatcherConfig,
) -> Option<Detection> {
    let result = score_behaviors(events, signature);
    if !passes(result.score, config.elevated_threshold) {
        return None;
    }

    Some(Detection {
        threat_name: signature.name.clone(),
        category: ELEVATED_CATEGORY.to_string(),
        confidence: result.score,
        severity: ELEVATED_SEVERITY,
        matched_behavior_names: result.matched_behaviors,
        raw_behavioral_score: result.score,
        is_elevated: true,
        kill_chain_stage: KillChainStage::AiAutonomousExecution,
        recommended_action: RecommendedAction::AiImmediateIsolation,
        evidence_events: result.evidence,
        detection_time: Utc::now(),
    })
}

// ============================================================================
// STAGE & ACTION
// ============================================================================

/// Scan matched behavior names (case-insensitive) against the keyword table
/// in priority order. First hit wins, otherwise `Execution`.
pub fn kill_chain_stage(matched_behaviors: &[String], rules: &[KillChainRule]) -> KillChainStage {
    let joined = matched_behaviors.join(" ").to_lowercase();

    rules
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|k| joined.contains(k.to_lowercase().as_str()))
        })
        .map(|rule| rule.stage)
        .unwrap_or(KillChainStage::Execution)
}

/// Deterministic lookup on (severity, confidence)
pub fn recommended_action(severity: u8, confidence: f64) -> RecommendedAction {
    let at_least = |threshold: f64| confidence + SCORE_EPSILON >= threshold;

    if severity >= 9 && at_least(0.8) {
        RecommendedAction::ImmediateIsolation
    } else if severity >= 8 && at_least(0.7) {
        RecommendedAction::IsolateAndInvestigate
    } else if severity >= 6 && at_least(0.6) {
        RecommendedAction::MonitorClosely
    } else {
        RecommendedAction::ManualReview
    }
}

// ============================================================================
// BATCH ENTRY POINT
// ============================================================================

/// Analyze a batch against every signature in the store.
///
/// Malformed events are skipped (and logged), never raised. Output is sorted
/// by non-increasing confidence; ties keep store order, ordinary before elevated.
pub fn analyze_behavior(
    events: &[Event],
    store: &SignatureStore,
    config: &MatcherConfig,
) -> Vec<Detection> {
    let valid = events.iter().filter(|event| match event.validate() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("[Signatures] Skipping malformed event: {}", e);
            false
        }
    });
    let prepared = prepare_events(valid);

    let mut detections: Vec<Detection> = store
        .signatures()
        .iter()
        .filter_map(|sig| match_prepared(&prepared, sig, config))
        .collect();

    if config.enable_elevated {
        detections.extend(
            store
                .elevated()
                .iter()
                .filter_map(|sig| match_elevated_prepared(&prepared, sig, config)),
        );
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    detections
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::event::EventType;
    use crate::logic::signatures::rules::default_kill_chain_rules;

    fn event(description: &str) -> Event {
        Event::new(1.0, EventType::PROCESS_EXECUTION).with_description(description)
    }

    fn sig() -> Signature {
        Signature::new("Test Stealer", "Infostealer", 8)
            .behavior("Credential Dumping", 0.5, &["mimikatz"])
            .behavior("Data Exfiltration", 0.3, &["pastebin"])
            .behavior("Persistence", 0.2, &["runonce"])
    }

    #[test]
    fn test_zero_weight_signature_never_matches() {
        let empty = Signature::new("Empty", "X", 9);
        let events = vec![event("anything")];
        assert!(match_signature(&events, &empty, &MatcherConfig::default()).is_none());
        assert!(match_elevated(&events, &empty, &MatcherConfig::default()).is_none());
    }

    #[test]
    fn test_full_match_is_confidence_one() {
        let events = vec![event("MIMIKATZ sekurlsa run; upload to PasteBin; RunOnce key set")];
        let detection = match_signature(&events, &sig(), &MatcherConfig::default()).unwrap();
        assert!((detection.confidence - 1.0).abs() < 1e-12);
        assert_eq!(detection.matched_behavior_names.len(), 3);
        // one evidence entry per behavior, even from the same event
        assert_eq!(detection.evidence_events.len(), 3);
    }

    #[test]
    fn test_below_threshold_rejected() {
        // only 0.5 of 1.0
        let events = vec![event("mimikatz launched")];
        assert!(match_signature(&events, &sig(), &MatcherConfig::default()).is_none());
    }

    #[test]
    fn test_behavior_credited_once() {
        let events = vec![
            event("mimikatz one"),
            event("mimikatz two"),
            event("pastebin upload"),
        ];
        let detection = match_signature(&events, &sig(), &MatcherConfig::default()).unwrap();
        assert!((detection.confidence - 0.8).abs() < 1e-9);
        assert_eq!(detection.evidence_events[0].description, "mimikatz one");
        assert_eq!(detection.evidence_events[1].description, "pastebin upload");
        // exfiltration sits above credential access in the priority table
        assert_eq!(detection.kill_chain_stage, KillChainStage::Exfiltration);
        assert_eq!(detection.recommended_action, RecommendedAction::IsolateAndInvestigate);
    }

    #[test]
    fn test_matches_structured_fields_and_indicators() {
        let events = vec![
            Event::new(1.0, EventType::PROCESS_EXECUTION).with_process("MimiKatz.exe"),
            Event::new(2.0, EventType::NETWORK_CONNECTION).with_indicators(&["https://pastebin.com/raw/x"]),
        ];
        let detection = match_signature(&events, &sig(), &MatcherConfig::default()).unwrap();
        assert_eq!(detection.matched_behavior_names, vec!["Credential Dumping", "Data Exfiltration"]);
    }

    #[test]
    fn test_elevated_has_fixed_fields() {
        let ai = Signature::new("AI Agent", "AI", 3)
            .behavior("LLM API Calls", 0.7, &["api.openai.com"])
            .behavior("Tooling", 0.3, &["tool call"]);
        let events = vec![event("POST api.openai.com/v1/chat")];

        let detection = match_elevated(&events, &ai, &MatcherConfig::default()).unwrap();
        assert!(detection.is_elevated);
        assert_eq!(detection.severity, ELEVATED_SEVERITY);
        assert_eq!(detection.category, ELEVATED_CATEGORY);
        assert_eq!(detection.kill_chain_stage, KillChainStage::AiAutonomousExecution);
        assert_eq!(detection.recommended_action, RecommendedAction::AiImmediateIsolation);

        // 0.3 alone is below the elevated bar, even though ordinary would need 0.6 too
        let weak = vec![event("tool call issued")];
        assert!(match_elevated(&weak, &ai, &MatcherConfig::default()).is_none());
    }

    #[test]
    fn test_elevated_threshold_higher_than_ordinary() {
        let s = Signature::new("Edge", "X", 5)
            .behavior("A", 0.65, &["alpha"])
            .behavior("B", 0.35, &["beta"]);
        let events = vec![event("alpha only")];
        let cfg = MatcherConfig::default();
        assert!(match_signature(&events, &s, &cfg).is_some());
        assert!(match_elevated(&events, &s, &cfg).is_none());
    }

    #[test]
    fn test_kill_chain_priority() {
        let rules = default_kill_chain_rules();
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            kill_chain_stage(&names(&["Registry Persistence", "Mass Encryption"]), &rules),
            KillChainStage::Impact
        );
        assert_eq!(
            kill_chain_stage(&names(&["Credential Dumping", "Security Evasion"]), &rules),
            KillChainStage::CredentialAccess
        );
        assert_eq!(
            kill_chain_stage(&names(&["EDR Killer Driver"]), &rules),
            KillChainStage::DefenseEvasion
        );
        assert_eq!(
            kill_chain_stage(&names(&["Reverse Shell"]), &rules),
            KillChainStage::Execution
        );
    }

    #[test]
    fn test_recommended_action_table() {
        assert_eq!(recommended_action(10, 0.85), RecommendedAction::ImmediateIsolation);
        assert_eq!(recommended_action(9, 0.75), RecommendedAction::IsolateAndInvestigate);
        assert_eq!(recommended_action(8, 0.7), RecommendedAction::IsolateAndInvestigate);
        assert_eq!(recommended_action(7, 0.9), RecommendedAction::MonitorClosely);
        assert_eq!(recommended_action(6, 0.6), RecommendedAction::MonitorClosely);
        assert_eq!(recommended_action(5, 1.0), RecommendedAction::ManualReview);
        assert_eq!(recommended_action(10, 0.5), RecommendedAction::ManualReview);
    }

    #[test]
    fn test_confidence_always_in_range() {
        let store = SignatureStore::with_defaults();
        let events = vec![
            event("vssadmin delete shadows /all"),
            event("mimikatz sekurlsa::logonpasswords"),
            event("xmrig stratum+tcp://pool"),
        ];
        for sig in store.signatures() {
            if let Some(d) = match_signature(&events, sig, &MatcherConfig::default()) {
                assert!((0.0..=1.0).contains(&d.confidence));
            }
        }
    }

    #[test]
    fn test_analyze_behavior_sorted_and_skips_malformed() {
        let store = SignatureStore::with_defaults();
        let events = vec![
            event("xmrig started").with_indicators(&["stratum+tcp://pool.minexmr.com"]),
            event("psexec \\\\host payload").with_indicators(&["copied to ADMIN$"]),
            Event::new(1.0, EventType::SCAN).with_severity(0), // malformed
        ];
        let detections = analyze_behavior(&events, &store, &MatcherConfig::default());
        assert!(!detections.is_empty());
        for pair in detections.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_analyze_behavior_elevated_toggle() {
        let store = SignatureStore::with_defaults();
        let events = vec![
            event("script calls api.openai.com to regenerate itself").with_indicators(&["polymorphic", "eval("]),
        ];

        let on = analyze_behavior(&events, &store, &MatcherConfig::default());
        assert!(on.iter().any(|d| d.is_elevated));

        let cfg = MatcherConfig { enable_elevated: false, ..Default::default() };
        let off = analyze_behavior(&events, &store, &cfg);
        assert!(off.iter().all(|d| !d.is_elevated));
    }
}
