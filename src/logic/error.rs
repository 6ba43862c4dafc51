//! Error handling
//!
//! Only construction and ingestion paths return errors. Analysis functions are
//! total and never surface a `DetectError` to their caller.

use thiserror::Error;

pub type DetectResult<T> = Result<T, DetectError>;

#[derive(Debug, Error)]
pub enum DetectError {
    // Construction errors
    #[error("signature store is empty: at least one signature is required")]
    EmptySignatureStore,

    #[error("invalid signature '{name}': {reason}")]
    InvalidSignature { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Ingestion errors
    #[error("invalid event type '{0}'")]
    InvalidEventType(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    // Pipeline errors
    #[error("channel closed")]
    ChannelClosed,

    #[error("processor is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DetectError {
    pub fn invalid_signature(name: &str, reason: impl Into<String>) -> Self {
        DetectError::InvalidSignature {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
