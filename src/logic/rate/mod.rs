//! Rate Tracking Module
//!
//! Sliding time window over recent events, keyed by arrival time.
//!
//! ## Usage
//! ```ignore
//! let mut tracker = RateTracker::new(RateConfig::default());
//! tracker.add(event, now);
//! let counts = tracker.event_counts(now);
//! ```

pub mod tracker;

pub use tracker::{RateConfig, RateTracker};
