//! Sequence Pattern Module
//!
//! Two independent checks over the rate window:
//! threshold rules over per-type counts, and ordered kill-chain subsequences
//! over one source's recent events.
//!
//! ## Structure
//! - `rules.rs` - Default threshold and sequence tables
//! - `matcher.rs` - `SequenceMatcher`

pub mod matcher;
pub mod rules;

pub use matcher::{contains_sequence, SequenceMatcher};
pub use rules::{SequenceConfig, SequenceRule, ThresholdRule};
