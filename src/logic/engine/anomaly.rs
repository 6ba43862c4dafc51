//! Single-event anomaly check against a static "normal" baseline

use serde::{Deserialize, Serialize};

use crate::logic::event::{Event, EventType};

// ============================================================================
// DEFAULTS
// ============================================================================

pub const NORMAL_PROCESSES: &[&str] = &["explorer.exe", "chrome.exe", "firefox.exe"];

/// Names malware likes to borrow
pub const DISGUISE_NAMES: &[&str] = &["svchost", "explorer"];

pub const LLM_API_HOSTS: &[&str] = &["api.gemini.google.com", "api.openai.com", "api.anthropic.com"];

pub const PERSISTENCE_KEYS: &[&str] = &["\\Run", "\\RunOnce"];

/// Buffered events inspected by the mass-modification rule
pub const MASS_MODIFICATION_SAMPLE: usize = 100;

/// File modifications strictly above this within the sample
pub const MASS_MODIFICATION_THRESHOLD: usize = 50;

// ============================================================================
// BASELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyBaseline {
    pub normal_processes: Vec<String>,
    pub disguise_names: Vec<String>,
    pub llm_api_hosts: Vec<String>,
    pub persistence_keys: Vec<String>,
    pub mass_modification_sample: usize,
    pub mass_modification_threshold: usize,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AnomalyBaseline {
    fn default() -> Self {
        Self {
            normal_processes: owned(NORMAL_PROCESSES),
            disguise_names: owned(DISGUISE_NAMES),
            llm_api_hosts: owned(LLM_API_HOSTS),
            persistence_keys: owned(PERSISTENCE_KEYS),
            mass_modification_sample: MASS_MODIFICATION_SAMPLE,
            mass_modification_threshold: MASS_MODIFICATION_THRESHOLD,
        }
    }
}

impl AnomalyBaseline {
    /// Every finding for `event`, joined with "; ". `recent` is the buffered
    /// event history, oldest first.
    pub fn check<'a, I>(&self, event: &Event, recent: I) -> Option<String>
    where
        I: DoubleEndedIterator<Item = &'a Event>,
    {
        let mut findings = Vec::new();

        if let Some(name) = event.process_name.as_deref() {
            let is_normal = self.normal_processes.iter().any(|p| p.eq_ignore_ascii_case(name));
            let lower = name.to_lowercase();
            if !is_normal && self.disguise_names.iter().any(|d| lower.contains(d.as_str())) {
                findings.push(format!("Suspicious process: {}", name));
            }
        }

        if let Some(endpoint) = event.network_endpoint.as_deref() {
            if event.event_type == EventType::SCRIPT_EXECUTION
                && self.llm_api_hosts.iter().any(|h| endpoint.contains(h.as_str()))
            {
                findings.push("AI-Polymorphic: Script calling LLM API for self-modification".to_string());
            }
            if endpoint.contains("pastebin.com") {
                findings.push("C2 Communication: Pastebin used as C2 server".to_string());
            }
            if endpoint.to_lowercase().contains("tor") {
                findings.push("Suspicious network: Tor connection detected".to_string());
            }
        }

        let file_mods = recent
            .rev()
            .take(self.mass_modification_sample)
            .filter(|e| e.event_type == EventType::FILE_MODIFICATION)
            .count();
        if file_mods > self.mass_modification_threshold {
            findings.push("RANSOMWARE INDICATOR: Rapid mass file modification".to_string());
        }

        if let Some(key) = event.registry_key.as_deref() {
            if self.persistence_keys.iter().any(|k| key.contains(k.as_str())) {
                findings.push("Persistence: Registry Run key modification".to_string());
            }
        }

        if findings.is_empty() {
            None
        } else {
            Some(findings.join("; "))
        }
    }
}
