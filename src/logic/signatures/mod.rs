//! Signatures Module
//!
//! Weighted behavioral signatures and the core matching algorithm.
//!
//! ## Structure
//! - `types`: Signature, Behavior, Detection, KillChainStage, RecommendedAction
//! - `rules`: thresholds, kill-chain keyword table, matcher config
//! - `store`: read-only signature store (ordinary + elevated sets)
//! - `builtin`: default in-memory signature database
//! - `matcher`: weighted behavior matching, kill-chain stage, action lookup
//!
//! ## Usage
//! ```ignore
//! let store = SignatureStore::with_defaults();
//! let detections = analyze_behavior(&events, &store, &MatcherConfig::default());
//! ```

pub mod types;
pub mod rules;
pub mod store;
pub mod builtin;
pub mod matcher;

pub use types::{Behavior, Detection, KillChainStage, RecommendedAction, Signature};
pub use rules::{
    KillChainRule, MatcherConfig, ELEVATED_CATEGORY, ELEVATED_CONFIDENCE_THRESHOLD,
    ELEVATED_SEVERITY, SIGNATURE_CONFIDENCE_THRESHOLD,
};
pub use store::SignatureStore;
pub use matcher::{
    analyze_behavior, kill_chain_stage, match_elevated, match_signature, prepare_events,
    recommended_action, PreparedEvent,
};
