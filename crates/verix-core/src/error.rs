//! # Error Types
//!
//! Error hierarchy shared by the verix crates. All errors derive their
//! `Display` and `Error` implementations through `thiserror`.
//!
//! Classification of authority verdicts is NOT an error: rejected lines,
//! recoverable codes and exhausted retries are reported as data in the
//! submission outcome and session result. The types here cover genuine
//! programming or input faults only.

use thiserror::Error;

/// Top-level error type for the foundation crate.
#[derive(Error, Debug)]
pub enum VerixError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// An identifier or value failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Content integrity violation.
    #[error("integrity error: {0}")]
    Integrity(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be decimal strings or integers.
    #[error("float values are not permitted in canonical representations; use a decimal string for amount: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation failure for an identifier or formatted value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// NIF is not exactly 9 ASCII alphanumeric characters.
    #[error("invalid NIF {0:?}: expected 9 alphanumeric characters")]
    InvalidNif(String),

    /// Invoice reference is empty or too long.
    #[error("invalid invoice reference {value:?}: {reason}")]
    InvalidInvoiceRef {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Timestamp could not be parsed or is not UTC.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Monetary amount is not a plain decimal string.
    #[error("invalid amount {0:?}: expected an optional sign, digits, and at most 2 decimals")]
    InvalidAmount(String),

    /// A hex-encoded digest had the wrong length or alphabet.
    #[error("invalid digest hex {0:?}: expected 64 lowercase hex characters")]
    InvalidDigestHex(String),
}
