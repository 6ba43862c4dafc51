//! Profile Rules - thresholds for behavioral anomaly detection

use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectError, DetectResult};

// ============================================================================
// PER-SOURCE THRESHOLDS
// ============================================================================

/// Events from one source that count as a rapid escalation
pub const RAPID_ESCALATION_EVENTS: u64 = 20;

/// ... when seen within this many seconds of first contact
pub const RAPID_ESCALATION_WINDOW_SECS: f64 = 60.0;

/// Suspicion score strictly above this is flagged
pub const SUSPICION_THRESHOLD: u64 = 50;

/// Failed attempts strictly above this are flagged
pub const FAILURE_THRESHOLD: u64 = 10;

/// Points for cred-guess / exploit / exfil
pub const HIGH_RISK_POINTS: u64 = 10;

/// Points for scan
pub const SCAN_POINTS: u64 = 5;

/// Substrings marking an event type as a failed attempt
pub const FAILURE_MARKERS: &[&str] = &["fail", "denied"];

// ============================================================================
// BATCH THRESHOLDS
// ============================================================================

/// Distinct targets from one source strictly above this = lateral movement
pub const LATERAL_TARGET_THRESHOLD: usize = 5;

/// Distinct sources in a batch strictly above this = distributed attack
pub const DISTRIBUTED_SOURCE_THRESHOLD: usize = 20;

// ============================================================================
// BASELINE
// ============================================================================

pub const BUCKET_SECS: f64 = 60.0;
pub const BASELINE_WINDOW_SECS: f64 = 300.0;
pub const MIN_BASELINE_BUCKETS: usize = 3;
pub const SPIKE_Z_THRESHOLD: f64 = 3.0;

/// Inclusive local-hour range treated as off-hours
pub const OFF_HOURS_START: u32 = 2;
pub const OFF_HOURS_END: u32 = 5;
pub const OFF_HOURS_EVENT_THRESHOLD: usize = 50;
pub const OFF_HOURS_WINDOW_SECS: f64 = 300.0;

// ============================================================================
// STORE BOUNDS
// ============================================================================

/// Idle profiles older than this are dropped by `sweep`
pub const PROFILE_TTL_SECS: f64 = 3_600.0;
pub const MAX_PROFILES: usize = 10_000;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub rapid_escalation_events: u64,
    pub rapid_escalation_window_secs: f64,
    pub suspicion_threshold: u64,
    pub failure_threshold: u64,
    pub high_risk_points: u64,
    pub scan_points: u64,

    pub lateral_target_threshold: usize,
    pub distributed_source_threshold: usize,

    pub bucket_secs: f64,
    pub baseline_window_secs: f64,
    pub min_baseline_buckets: usize,
    pub spike_z_threshold: f64,

    pub off_hours_start: u32,
    pub off_hours_end: u32,
    pub off_hours_event_threshold: usize,
    pub off_hours_window_secs: f64,

    pub profile_ttl_secs: f64,
    pub max_profiles: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            rapid_escalation_events: RAPID_ESCALATION_EVENTS,
            rapid_escalation_window_secs: RAPID_ESCALATION_WINDOW_SECS,
            suspicion_threshold: SUSPICION_THRESHOLD,
            failure_threshold: FAILURE_THRESHOLD,
            high_risk_points: HIGH_RISK_POINTS,
            scan_points: SCAN_POINTS,
            lateral_target_threshold: LATERAL_TARGET_THRESHOLD,
            distributed_source_threshold: DISTRIBUTED_SOURCE_THRESHOLD,
            bucket_secs: BUCKET_SECS,
            baseline_window_secs: BASELINE_WINDOW_SECS,
            min_baseline_buckets: MIN_BASELINE_BUCKETS,
            spike_z_threshold: SPIKE_Z_THRESHOLD,
            off_hours_start: OFF_HOURS_START,
            off_hours_end: OFF_HOURS_END,
            off_hours_event_threshold: OFF_HOURS_EVENT_THRESHOLD,
            off_hours_window_secs: OFF_HOURS_WINDOW_SECS,
            profile_ttl_secs: PROFILE_TTL_SECS,
            max_profiles: MAX_PROFILES,
        }
    }
}

impl ProfileConfig {
    pub fn high_sensitivity() -> Self {
        Self {
            rapid_escalation_events: 10,
            suspicion_threshold: 30,
            failure_threshold: 5,
            lateral_target_threshold: 3,
            distributed_source_threshold: 10,
            spike_z_threshold: 2.0,
            ..Default::default()
        }
    }

    pub fn low_sensitivity() -> Self {
        Self {
            rapid_escalation_events: 50,
            suspicion_threshold: 100,
            failure_threshold: 25,
            lateral_target_threshold: 10,
            distributed_source_threshold: 50,
            spike_z_threshold: 4.0,
            ..Default::default()
        }
    }

    pub fn is_off_hours(&self, hour: u32) -> bool {
        (self.off_hours_start..=self.off_hours_end).contains(&hour)
    }

    pub fn validate(&self) -> DetectResult<()> {
        let positive = [
            ("rapid_escalation_window_secs", self.rapid_escalation_window_secs),
            ("bucket_secs", self.bucket_secs),
            ("baseline_window_secs", self.baseline_window_secs),
            ("off_hours_window_secs", self.off_hours_window_secs),
            ("profile_ttl_secs", self.profile_ttl_secs),
            ("spike_z_threshold", self.spike_z_threshold),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DetectError::InvalidConfig(format!("profile.{} must be > 0", name)));
            }
        }
        if self.max_profiles == 0 {
            return Err(DetectError::InvalidConfig("profile.max_profiles must be > 0".into()));
        }
        if self.min_baseline_buckets < 2 {
            return Err(DetectError::InvalidConfig(
                "profile.min_baseline_buckets must be >= 2".into(),
            ));
        }
        if self.off_hours_start > self.off_hours_end || self.off_hours_end > 23 {
            return Err(DetectError::InvalidConfig("profile off-hours range is invalid".into()));
        }
        Ok(())
    }
}
