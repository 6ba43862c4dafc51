use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_SWEEP_INTERVAL_MS};
use crate::logic::event::EventType;

// ============================================================================
// STATE
// ============================================================================

/// Idle -> Running -> Stopped. No transition leads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorState {
    Idle,
    Running,
    Stopped,
}

impl ProcessorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorState::Idle => "idle",
            ProcessorState::Running => "running",
            ProcessorState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Receive timeout; bounds how long a stop request can go unnoticed
    pub poll_interval_ms: u64,
    /// Profile TTL sweep period; runs even while events keep arriving
    pub sweep_interval_ms: u64,
    /// Feed every event into a per-source profile tracker
    pub enable_profiles: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            enable_profiles: false,
        }
    }
}

impl ProcessorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Point-in-time view of a running processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    pub state: ProcessorState,
    pub window_counts: BTreeMap<EventType, usize>,
    pub window_total: usize,
    pub processed: u64,
    pub incidents: u64,
    pub failed: u64,
    pub profiles: usize,
}
