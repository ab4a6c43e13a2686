//! Error types for podcrawl
//!
//! Failures before the fan-out (discovery, identifier extraction) abort the
//! whole batch. Failures during the fan-out are isolated to one identifier.

use thiserror::Error;

/// Show discovery and resolution errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShowError {
    /// Category page unreachable or no show links found
    #[error("Discovery failed for {source_url}: {reason}")]
    Discovery { source_url: String, reason: String },

    /// A discovered link does not carry a usable identifier
    #[error("No show identifier in {url}: {reason}")]
    IdentifierExtraction { url: String, reason: String },

    /// Network-level failure of one lookup
    #[error("Lookup of show {id} failed: {reason}")]
    Transport { id: u64, reason: String },

    /// Lookup response body is not the expected document
    #[error("Lookup response for show {id} is malformed: {reason}")]
    Decode { id: u64, reason: String },

    /// Resolver task for one identifier did not complete normally
    #[error("Resolver for show {id} aborted: {reason}")]
    Worker { id: u64, reason: String },
}

impl ShowError {
    /// Identifier of the failed lookup, `None` for batch-level failures
    pub fn identifier(&self) -> Option<u64> {
        match self {
            ShowError::Transport { id, .. }
            | ShowError::Decode { id, .. }
            | ShowError::Worker { id, .. } => Some(*id),
            ShowError::Discovery { .. } | ShowError::IdentifierExtraction { .. } => None,
        }
    }

    /// Whether this failure aborted the batch before any lookup ran
    pub fn is_batch_failure(&self) -> bool {
        self.identifier().is_none()
    }
}
