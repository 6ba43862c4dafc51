//! AI-Pattern Module
//!
//! Composite scorer estimating whether an event stream is machine-driven.
//! Independent of the signature matcher: needs no known signature, it blends
//! five heuristic signals into one probability.
//!
//! ## Structure
//! - `rules`: weights, keyword tables, attack phases, scorer config
//! - `scorer`: signal computation and the weighted blend

pub mod rules;
pub mod scorer;

pub use rules::{AttackPhase, ScorerConfig, SignalWeights, TimingMode};
pub use scorer::{AiPatternScore, AiPatternScorer, Signal};
