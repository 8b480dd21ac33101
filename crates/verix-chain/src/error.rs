//! Chain error types.

use thiserror::Error;

/// Errors from chain digest computation, verification and head storage.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Record content could not be canonicalized.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] verix_core::CanonicalizationError),

    /// Record field failed validation.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] verix_core::ValidationError),

    /// A link's `previous_digest` does not point at its predecessor.
    #[error("link #{index} previous digest mismatch: expected {expected:?}, got {actual:?}")]
    LinkMismatch {
        /// Position of the offending link.
        index: usize,
        /// The predecessor's digest (or the anchor for the first link).
        expected: Option<String>,
        /// The link's declared previous digest.
        actual: Option<String>,
    },

    /// A link's `content_digest` does not match the recomputed value.
    #[error("link #{index} content digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Position of the offending link.
        index: usize,
        /// The recomputed digest.
        expected: String,
        /// The digest stored in the link.
        actual: String,
    },

    /// Compare-and-set commit found a different head than the one the new
    /// link was built from. Committing would fork the chain.
    #[error("stale chain head for {emitter}: expected {expected:?}, found {actual:?}")]
    StaleHead {
        /// Emitter whose chain was being advanced.
        emitter: String,
        /// Head the caller built its link from.
        expected: Option<String>,
        /// Head actually stored.
        actual: Option<String>,
    },

    /// Backing store failure. The in-memory store never fails; this is the
    /// error persistent [`ChainStateStore`](crate::ChainStateStore)
    /// implementations report.
    #[error("chain store error: {0}")]
    Store(String),
}
