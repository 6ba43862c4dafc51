//! Signature Store
//!
//! Static, read-only set of signatures. Validated once at construction and
//! never mutated afterwards, so it can be shared freely behind an `Arc`.

use std::collections::HashSet;

use super::builtin;
use super::types::Signature;
use crate::logic::error::{DetectError, DetectResult};

#[derive(Debug, Clone)]
pub struct SignatureStore {
    signatures: Vec<Signature>,
    elevated: Vec<Signature>,
}

impl SignatureStore {
    /// Build a store from ordinary and elevated signature sets.
    ///
    /// Fails fast when both sets are empty, when a signature is structurally
    /// invalid, or when a name appears twice within the same set.
    pub fn new(signatures: Vec<Signature>, elevated: Vec<Signature>) -> DetectResult<Self> {
        if signatures.is_empty() && elevated.is_empty() {
            return Err(DetectError::EmptySignatureStore);
        }

        for set in [&signatures, &elevated] {
            let mut seen = HashSet::new();
            for sig in set.iter() {
                sig.validate()?;
                if !seen.insert(sig.name.as_str()) {
                    return Err(DetectError::invalid_signature(&sig.name, "duplicate name"));
                }
                if sig.behaviors.is_empty() {
                    log::warn!("[Signatures] '{}' has no behaviors and will never match", sig.name);
                }
            }
        }

        log::info!(
            "[Signatures] Loaded {} signatures, {} elevated patterns",
            signatures.len(),
            elevated.len()
        );

        Ok(Self { signatures, elevated })
    }

    /// Store backed by the built-in database
    pub fn with_defaults() -> Self {
        Self {
            signatures: builtin::default_signatures(),
            elevated: builtin::default_elevated_signatures(),
        }
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn elevated(&self) -> &[Signature] {
        &self.elevated
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.signatures
            .iter()
            .chain(self.elevated.iter())
            .find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.signatures.len() + self.elevated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
