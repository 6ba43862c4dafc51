//! Detection Engine Module
//!
//! Caller-owned facade over the batch detectors: signature matching, the
//! composite AI-pattern scorer, the single-event anomaly check, batch
//! anomaly rules and bounded detection history.
//!
//! ## Structure
//! - `detector.rs` - `DetectionEngine`
//! - `anomaly.rs` - `AnomalyBaseline` for `check_anomaly`
//! - `history.rs` - Detection ring buffer and `DetectionSummary`
//!
//! ## Usage
//! ```ignore
//! let engine = DetectionEngine::new(Arc::new(store), EngineConfig::from_env())?;
//! let detections = engine.analyze_behavior(&events);
//! let summary = engine.detection_summary();
//! ```

pub mod anomaly;
pub mod history;
pub mod detector;


pub use anomaly::AnomalyBaseline;
pub use history::{DetectionHistory, DetectionSummary};
pub use detector::DetectionEngine;
