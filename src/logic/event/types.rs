//! Event Types
//!
//! Core event types. Events are produced upstream and only ever read here.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectError, DetectResult};

// ============================================================================
// EVENT TYPE
// ============================================================================

/// Maximum length of an event type tag
const MAX_EVENT_TYPE_LEN: usize = 64;

/// Severity assigned when the producer did not set one
pub const DEFAULT_EVENT_SEVERITY: u8 = 5;

/// Short tag describing what an event is ("scan", "exfil", ...).
///
/// Open vocabulary, but validated at the boundary: lowercase ASCII
/// alphanumerics plus `-`, `_` and `.`, at most 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(Cow<'static, str>);

impl EventType {
    pub const RECON: EventType = EventType(Cow::Borrowed("recon"));
    pub const SCAN: EventType = EventType(Cow::Borrowed("scan"));
    pub const EXPLOIT: EventType = EventType(Cow::Borrowed("exploit"));
    pub const EXFIL: EventType = EventType(Cow::Borrowed("exfil"));
    pub const CRED_GUESS: EventType = EventType(Cow::Borrowed("cred-guess"));
    pub const ADMIN_ACCESS: EventType = EventType(Cow::Borrowed("admin-access"));
    pub const CONFIG_CHANGE: EventType = EventType(Cow::Borrowed("config-change"));
    pub const FILE_MODIFICATION: EventType = EventType(Cow::Borrowed("file_modification"));
    pub const PROCESS_EXECUTION: EventType = EventType(Cow::Borrowed("process_execution"));
    pub const SCRIPT_EXECUTION: EventType = EventType(Cow::Borrowed("script_execution"));
    pub const NETWORK_CONNECTION: EventType = EventType(Cow::Borrowed("network_connection"));

    /// Validate and build an event type
    pub fn new(tag: impl Into<String>) -> DetectResult<Self> {
        let tag = tag.into();
        if tag.is_empty() || tag.len() > MAX_EVENT_TYPE_LEN {
            return Err(DetectError::InvalidEventType(tag));
        }
        let valid = tag.bytes().all(|b| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.')
        });
        if !valid {
            return Err(DetectError::InvalidEventType(tag));
        }
        Ok(EventType(Cow::Owned(tag)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring test on the tag (e.g. "login-fail" contains "fail")
    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EventType {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::new(s)
    }
}

impl TryFrom<String> for EventType {
    type Error = DetectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EventType::new(value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.0.into_owned()
    }
}

impl PartialEq<str> for EventType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for EventType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ============================================================================
// EVENT
// ============================================================================

/// A single observed security-relevant event.
///
/// Never mutated after creation. Ordering inside a batch is significant for
/// sequence matching and must be preserved by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Seconds (wall clock or monotonic)
    pub timestamp: f64,

    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(default)]
    pub description: String,

    /// Indicators of compromise attached by the producer
    #[serde(default, alias = "iocs")]
    pub indicators: Vec<String>,

    /// 1-10, set by the producer and never reinterpreted
    #[serde(default = "default_severity")]
    pub severity: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "network_connection")]
    pub network_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

fn default_severity() -> u8 {
    DEFAULT_EVENT_SEVERITY
}

impl Event {
    pub fn new(timestamp: f64, event_type: EventType) -> Self {
        Self {
            timestamp,
            event_type,
            description: String::new(),
            indicators: Vec::new(),
            severity: DEFAULT_EVENT_SEVERITY,
            process_name: None,
            network_endpoint: None,
            file_path: None,
            registry_key: None,
            source_ip: None,
            target: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_indicators(mut self, indicators: &[&str]) -> Self {
        self.indicators = indicators.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_severity(mut self, severity: u8) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_process(mut self, name: &str) -> Self {
        self.process_name = Some(name.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.network_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.file_path = Some(path.to_string());
        self
    }

    pub fn with_registry_key(mut self, key: &str) -> Self {
        self.registry_key = Some(key.to_string());
        self
    }

    pub fn with_source_ip(mut self, ip: &str) -> Self {
        self.source_ip = Some(ip.to_string());
        self
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Check the fields the type system cannot enforce
    pub fn validate(&self) -> DetectResult<()> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(DetectError::MalformedEvent(format!(
                "timestamp {} is not a finite non-negative number",
                self.timestamp
            )));
        }
        if !(1..=10).contains(&self.severity) {
            return Err(DetectError::MalformedEvent(format!(
                "severity {} outside 1-10 ({} event)",
                self.severity, self.event_type
            )));
        }
        Ok(())
    }

    /// Populated structured fields, in a fixed order
    pub fn structured_fields(&self) -> impl Iterator<Item = &str> {
        [
            &self.process_name,
            &self.network_endpoint,
            &self.file_path,
            &self.registry_key,
            &self.source_ip,
            &self.target,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
    }

    /// Every free-text surface an indicator keyword may match against:
    /// description, each indicator, then each populated structured field.
    pub fn match_surfaces(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.description.as_str())
            .chain(self.indicators.iter().map(String::as_str))
            .chain(self.structured_fields())
    }

    /// Lowercased concatenation of the type tag and all match surfaces
    pub fn searchable_text(&self) -> String {
        let mut text = self.event_type.as_str().to_string();
        for surface in self.match_surfaces() {
            text.push(' ');
            text.push_str(surface);
        }
        text.to_lowercase()
    }
}

// ============================================================================
// TESTS
// ============================================================================
