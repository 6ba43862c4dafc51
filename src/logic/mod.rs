//! Logic Module - Detection Engines
//!
//! ## Architecture
//! - `event/` - Event model, validated event types, JSON ingestion
//! - `signatures/` - Weighted behavioral signatures and matching
//! - `ai_pattern/` - Composite machine-driven attack scorer
//! - `rate/` - Sliding time window
//! - `sequence/` - Threshold and ordered-sequence rules
//! - `profile/` - Per-source profiles and statistical baselines
//! - `processor/` - Streaming pipeline (actor)
//! - `engine/` - Caller-owned facade, anomaly check, detection history

// Shared
pub mod error;
pub mod config;
pub mod event;
pub mod incident;

// Batch detectors
pub mod signatures;
pub mod ai_pattern;
pub mod profile;

// Streaming
pub mod rate;
pub mod sequence;
pub mod processor;

pub mod engine;
