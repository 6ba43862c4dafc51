//! Behavioral Profile Module
//!
//! Per-source profiles, per-type rate baselines, and batch-level anomaly
//! rules (lateral movement, privilege escalation, distributed sources).
//!
//! ## Structure
//! - `types.rs` - `SourceProfile`
//! - `rules.rs` - Thresholds and `ProfileConfig`
//! - `tracker.rs` - `ProfileTracker` (per-source rules, eviction)
//! - `baseline.rs` - `TypeBaseline` (statistical spike, off-hours burst)
//! - `batch.rs` - Stateless rules over a batch of events
//!
//! ## Usage
//! ```ignore
//! let mut tracker = ProfileTracker::new(ProfileConfig::default());
//! tracker.observe(&event, now);
//! if let Some(incident) = tracker.check_source("10.0.0.5", now) { ... }
//! ```

pub mod types;
pub mod rules;
pub mod tracker;
pub mod baseline;
pub mod batch;


pub use types::SourceProfile;
pub use rules::ProfileConfig;
pub use tracker::ProfileTracker;
pub use baseline::{local_hour, TypeBaseline};
pub use batch::{detect_distributed_attack, detect_lateral_movement, detect_privilege_escalation};
