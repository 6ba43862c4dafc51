use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RATE_MAX_ENTRIES, DEFAULT_RATE_WINDOW_SECS};
use crate::logic::event::{Event, EventType};

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Sliding window length in seconds
    pub window_secs: f64,
    /// Oldest entries are dropped beyond this, regardless of age
    pub max_entries: usize,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_RATE_WINDOW_SECS,
            max_entries: DEFAULT_RATE_MAX_ENTRIES,
        }
    }
}

// ============================================================================
// TRACKER
// ============================================================================

/// Append-only window of `(event, arrival)` pairs.
///
/// Every add and every query first drops entries whose arrival is older than
/// `now - window_secs`. Arrival times are supplied by the caller and are
/// expected to be non-decreasing.
#[derive(Debug)]
pub struct RateTracker {
    entries: VecDeque<(Event, f64)>,
    config: RateConfig,
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new(RateConfig::default())
    }
}

impl RateTracker {
    pub fn new(config: RateConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            config,
        }
    }

    pub fn window_secs(&self) -> f64 {
        self.config.window_secs
    }

    pub fn add(&mut self, event: Event, now: f64) {
        self.prune(now);

        while self.entries.len() >= self.config.max_entries.max(1) {
            self.entries.pop_front();
        }
        self.entries.push_back((event, now));
    }

    /// Snapshot of per-type counts inside the window
    pub fn event_counts(&mut self, now: f64) -> BTreeMap<EventType, usize> {
        self.prune(now);

        let mut counts = BTreeMap::new();
        for (event, _) in &self.entries {
            *counts.entry(event.event_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Snapshot of in-window events from one source, oldest first
    pub fn events_by_source(&mut self, source_ip: &str, now: f64) -> Vec<Event> {
        self.prune(now);

        self.entries
            .iter()
            .filter(|(e, _)| e.source_ip.as_deref() == Some(source_ip))
            .map(|(e, _)| e.clone())
            .collect()
    }

    /// Events per second for one type over the full window
    pub fn rate(&mut self, event_type: &EventType, now: f64) -> f64 {
        self.prune(now);

        if self.config.window_secs <= 0.0 {
            return 0.0;
        }
        let count = self
            .entries
            .iter()
            .filter(|(e, _)| &e.event_type == event_type)
            .count();
        count as f64 / self.config.window_secs
    }

    pub fn total(&mut self, now: f64) -> usize {
        self.prune(now);
        self.entries.len()
    }

    fn prune(&mut self, now: f64) {
        let cutoff = now - self.config.window_secs;
        while let Some((_, arrival)) = self.entries.front() {
            if *arrival < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}
